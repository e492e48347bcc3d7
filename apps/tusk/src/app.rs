//! Command execution against a locally bootstrapped upload engine.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use tracing::{debug, info};
use tusk_adapter::{Action, Request, Response, UploadAdapter};
use tusk_engine::{ChunkWriter, JsonFileStore, UploadManager, stream_from_bytes};
use tusk_protocol::constants::{OFFSET_OCTET_STREAM, headers};
use tusk_protocol::encode_metadata;
use tusk_transfer::ChunkReader;

use crate::Command;
use crate::config::Config;

/// Location prefix reported for uploads.
const BASE_PATH: &str = "/files";

pub async fn run(mut config: Config, config_path: &Path, command: Command) -> anyhow::Result<()> {
    let mut client = Client::bootstrap(&config).await?;

    match command {
        Command::Push {
            file,
            mime,
            chunk_size,
        } => {
            let chunk_size = chunk_size.unwrap_or(config.chunk_size);
            let id = client.push(&file, mime.as_deref(), chunk_size).await?;
            println!("{id}");
        }
        Command::Resume {
            id,
            file,
            chunk_size,
        } => {
            let chunk_size = chunk_size.unwrap_or(config.chunk_size);
            let offset = client.resume(&id, &file, chunk_size).await?;
            println!("{id} {offset}");
        }
        Command::Status { id } => {
            let resp = client.send(Action::Get { id }).await;
            print_json(expect_status(resp, 200)?)?;
        }
        Command::List { page } => {
            let resp = client
                .send(Action::List {
                    page,
                    page_size: None,
                })
                .await;
            print_json(expect_status(resp, 200)?)?;
        }
        Command::Options => {
            let resp = expect_status(client.send(Action::Options).await, 204)?;
            for (name, value) in &resp.headers {
                println!("{name}: {value}");
            }
        }
        Command::Token { rotate: false } => {
            let resp = expect_status(client.send(Action::GetToken).await, 200)?;
            print_json(resp)?;
        }
        Command::Token { rotate: true } => {
            config.token = client.rotate_token().await?;
            config.save(config_path)?;
            println!("{}", config.token);
        }
    }
    Ok(())
}

/// Drives the adapter in-process with the configured token.
pub struct Client {
    adapter: UploadAdapter,
    token: String,
}

impl Client {
    /// Creates the storage directories, checks the file directory is
    /// writable and wires store, writer and manager together.
    pub async fn bootstrap(config: &Config) -> anyhow::Result<Self> {
        tokio::fs::create_dir_all(&config.file_directory)
            .await
            .with_context(|| {
                format!(
                    "cannot create file directory {}",
                    config.file_directory.display()
                )
            })?;
        ensure_writable(&config.file_directory).await?;

        let store = JsonFileStore::open(&config.records_directory)
            .await
            .with_context(|| {
                format!(
                    "cannot open records directory {}",
                    config.records_directory.display()
                )
            })?;
        info!(
            files = %config.file_directory.display(),
            records = %store.dir().display(),
            "upload store ready"
        );

        let manager = UploadManager::new(
            Arc::new(store),
            ChunkWriter::new(&config.file_directory),
            config.engine_config(),
        );

        Ok(Self {
            adapter: UploadAdapter::new(Arc::new(manager), config.token.clone(), BASE_PATH),
            token: config.token.clone(),
        })
    }

    async fn send(&self, action: Action) -> Response {
        self.adapter
            .handle(Request::new(action).with_token(self.token.clone()))
            .await
    }

    /// Replaces the access token with a freshly generated one and
    /// returns it. Later requests from this client use the new token.
    pub async fn rotate_token(&mut self) -> anyhow::Result<String> {
        let literal = tusk_adapter::generate_token();
        let resp = self
            .send(Action::SetToken {
                literal: literal.clone(),
            })
            .await;
        expect_status(resp, 200)?;
        self.token = literal.clone();
        info!("access token rotated");
        Ok(literal)
    }

    /// Creates an upload for `file` and sends it chunk by chunk.
    /// Returns the new upload id.
    pub async fn push(
        &self,
        file: &Path,
        mime: Option<&str>,
        chunk_size: usize,
    ) -> anyhow::Result<String> {
        let meta = tokio::fs::metadata(file)
            .await
            .with_context(|| format!("cannot read {}", file.display()))?;
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let fingerprint = fingerprint(&name, &meta);

        let metadata = encode_metadata([
            ("filename", name.as_str()),
            ("fingerprint", fingerprint.as_str()),
        ]);
        let resp = self
            .send(Action::Create {
                upload_length: meta.len(),
                metadata: Some(metadata),
                mime_type: mime.map(str::to_string),
            })
            .await;
        let resp = expect_status(resp, 201)?;

        let id = resp
            .header(headers::LOCATION)
            .and_then(|loc| loc.rsplit('/').next())
            .map(str::to_string)
            .context("create response carried no location")?;
        info!(upload_id = %id, file = %file.display(), bytes = meta.len(), "upload started");

        self.send_from(&id, file.to_path_buf(), 0, chunk_size).await?;
        Ok(id)
    }

    /// Continues upload `id` from the offset the server reports.
    /// Returns the final offset.
    pub async fn resume(&self, id: &str, file: &Path, chunk_size: usize) -> anyhow::Result<u64> {
        let resp = self.send(Action::Head { id: id.to_string() }).await;
        let resp = expect_status(resp, 204)?;
        let offset = header_u64(&resp, headers::UPLOAD_OFFSET)?;
        let length = header_u64(&resp, headers::UPLOAD_LENGTH)?;

        if offset == length {
            info!(upload_id = %id, "upload already complete");
            return Ok(offset);
        }
        info!(upload_id = %id, offset, length, "resuming upload");
        self.send_from(id, file.to_path_buf(), offset, chunk_size)
            .await
    }

    async fn send_from(
        &self,
        id: &str,
        path: PathBuf,
        offset: u64,
        chunk_size: usize,
    ) -> anyhow::Result<u64> {
        let mut reader = tokio::task::spawn_blocking(move || {
            let mut reader = ChunkReader::new(&path, chunk_size)?;
            reader.seek_to(offset)?;
            Ok::<_, tusk_transfer::TransferError>(reader)
        })
        .await??;

        let total = reader.file_size();
        let mut acknowledged = offset;
        loop {
            let (returned, chunk) = tokio::task::spawn_blocking(move || {
                let chunk = reader.next_chunk();
                (reader, chunk)
            })
            .await?;
            reader = returned;

            let Some(chunk) = chunk? else {
                break;
            };
            let len = chunk.data.len() as u64;
            let resp = self
                .send(Action::Patch {
                    id: id.to_string(),
                    offset: chunk.offset,
                    content_length: len,
                    content_type: Some(OFFSET_OCTET_STREAM.to_string()),
                    body: stream_from_bytes(chunk.data),
                })
                .await;
            let resp = expect_status(resp, 204)?;
            acknowledged = header_u64(&resp, headers::UPLOAD_OFFSET)?;
            debug!(upload_id = %id, offset = acknowledged, total, "chunk acknowledged");
        }

        info!(upload_id = %id, bytes = acknowledged, "upload finished");
        Ok(acknowledged)
    }
}

async fn ensure_writable(dir: &Path) -> anyhow::Result<()> {
    let marker = dir.join(".tusk-write-check");
    tokio::fs::write(&marker, b"")
        .await
        .with_context(|| format!("file directory {} is not writable", dir.display()))?;
    tokio::fs::remove_file(&marker).await?;
    Ok(())
}

fn fingerprint(name: &str, meta: &std::fs::Metadata) -> String {
    let modified = meta
        .modified()
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
        .unwrap_or_default();
    format!("{name}-{}-{modified}", meta.len())
}

fn expect_status(resp: Response, status: u16) -> anyhow::Result<Response> {
    if resp.status == status {
        return Ok(resp);
    }
    match resp.body.as_ref().and_then(|b| b.get("error")) {
        Some(reason) => bail!("request failed with status {}: {reason}", resp.status),
        None => bail!("request failed with status {}", resp.status),
    }
}

fn header_u64(resp: &Response, name: &str) -> anyhow::Result<u64> {
    resp.header(name)
        .with_context(|| format!("response is missing {name}"))?
        .parse()
        .with_context(|| format!("malformed {name} header"))
}

fn print_json(resp: Response) -> anyhow::Result<()> {
    let body = resp.body.unwrap_or_default();
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}
