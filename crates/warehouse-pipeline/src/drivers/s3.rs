//! S3 staging bucket driver.
//!
//! Uploads above [`MULTIPART_THRESHOLD`] go through a multipart upload, so
//! dumps larger than the 5 GiB single-PUT limit still stage. Downloads stream
//! the object body to disk.

use std::path::Path;

use async_trait::async_trait;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::{ByteStream, Length};
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_sdk_s3::Client;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::config::StorageConfig;
use crate::core::traits::ObjectStore;
use crate::error::{PipelineError, Result};

const COLLABORATOR: &str = "storage";

/// Files at or above this size are uploaded in parts.
pub const MULTIPART_THRESHOLD: u64 = 100 * 1024 * 1024;

const MIN_PART_SIZE: u64 = 64 * 1024 * 1024;

/// S3 accepts at most this many parts per upload.
const MAX_PARTS: u64 = 10_000;

/// Byte ranges `(offset, length)` covering a file of `len` bytes.
fn plan_parts(len: u64) -> Vec<(u64, u64)> {
    let part_size = MIN_PART_SIZE.max(len.div_ceil(MAX_PARTS));
    let mut parts = Vec::new();
    let mut offset = 0;
    while offset < len {
        let size = part_size.min(len - offset);
        parts.push((offset, size));
        offset += size;
    }
    parts
}

/// Copy `body` into `file`, returning the number of bytes written.
async fn stream_to_file<R>(body: &mut R, file: &mut tokio::fs::File) -> std::io::Result<u64>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let written = tokio::io::copy(body, file).await?;
    file.flush().await?;
    Ok(written)
}

/// S3 bucket used as the staging area.
pub struct S3Store {
    client: Client,
    bucket: String,
}

impl S3Store {
    /// Build a client from the default AWS credential chain.
    pub async fn connect(config: &StorageConfig) -> Result<Self> {
        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .load()
            .await;

        info!(
            "Using S3 staging bucket {} ({})",
            config.bucket, config.region
        );

        Ok(Self {
            client: Client::new(&sdk_config),
            bucket: config.bucket.clone(),
        })
    }

    async fn put_single(&self, local: &Path, key: &str) -> Result<()> {
        let body = ByteStream::from_path(local).await.map_err(|e| {
            PipelineError::external(COLLABORATOR, format!("read {}", local.display()), e)
        })?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                PipelineError::external(
                    COLLABORATOR,
                    format!("upload {}", self.object_uri(key)),
                    DisplayErrorContext(e),
                )
            })?;
        Ok(())
    }

    async fn put_multipart(&self, local: &Path, key: &str, len: u64) -> Result<()> {
        let created = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                PipelineError::external(
                    COLLABORATOR,
                    format!("start multipart upload {}", self.object_uri(key)),
                    DisplayErrorContext(e),
                )
            })?;
        let upload_id = created.upload_id().map(str::to_string).ok_or_else(|| {
            PipelineError::external(
                COLLABORATOR,
                format!("start multipart upload {}", self.object_uri(key)),
                "no upload id returned",
            )
        })?;

        let result = match self.put_parts(local, key, &upload_id, len).await {
            Ok(parts) => self
                .client
                .complete_multipart_upload()
                .bucket(&self.bucket)
                .key(key)
                .upload_id(&upload_id)
                .multipart_upload(
                    CompletedMultipartUpload::builder()
                        .set_parts(Some(parts))
                        .build(),
                )
                .send()
                .await
                .map(|_| ())
                .map_err(|e| {
                    PipelineError::external(
                        COLLABORATOR,
                        format!("complete multipart upload {}", self.object_uri(key)),
                        DisplayErrorContext(e),
                    )
                }),
            Err(e) => Err(e),
        };

        if result.is_err() {
            // Uploaded parts persist until the upload is aborted
            if let Err(e) = self
                .client
                .abort_multipart_upload()
                .bucket(&self.bucket)
                .key(key)
                .upload_id(&upload_id)
                .send()
                .await
            {
                warn!(
                    "Failed to abort multipart upload {} of {}: {}",
                    upload_id,
                    self.object_uri(key),
                    DisplayErrorContext(e)
                );
            }
        }
        result
    }

    async fn put_parts(
        &self,
        local: &Path,
        key: &str,
        upload_id: &str,
        len: u64,
    ) -> Result<Vec<CompletedPart>> {
        let plan = plan_parts(len);
        let mut completed = Vec::with_capacity(plan.len());

        for (index, (offset, size)) in plan.into_iter().enumerate() {
            let part_number = index as i32 + 1;
            let body = ByteStream::read_from()
                .path(local)
                .offset(offset)
                .length(Length::Exact(size))
                .build()
                .await
                .map_err(|e| {
                    PipelineError::external(
                        COLLABORATOR,
                        format!("read part {} of {}", part_number, local.display()),
                        e,
                    )
                })?;

            let resp = self
                .client
                .upload_part()
                .bucket(&self.bucket)
                .key(key)
                .upload_id(upload_id)
                .part_number(part_number)
                .body(body)
                .send()
                .await
                .map_err(|e| {
                    PipelineError::external(
                        COLLABORATOR,
                        format!("upload part {} of {}", part_number, self.object_uri(key)),
                        DisplayErrorContext(e),
                    )
                })?;

            debug!("Uploaded part {} ({} bytes) of {}", part_number, size, key);
            completed.push(
                CompletedPart::builder()
                    .set_e_tag(resp.e_tag().map(str::to_string))
                    .part_number(part_number)
                    .build(),
            );
        }

        Ok(completed)
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let resp = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix)
                .set_continuation_token(continuation.take())
                .send()
                .await
                .map_err(|e| {
                    PipelineError::external(
                        COLLABORATOR,
                        format!("list s3://{}/{}", self.bucket, prefix),
                        DisplayErrorContext(e),
                    )
                })?;

            keys.extend(
                resp.contents()
                    .iter()
                    .filter_map(|obj| obj.key().map(str::to_string)),
            );

            match resp.next_continuation_token() {
                Some(token) if resp.is_truncated().unwrap_or(false) => {
                    continuation = Some(token.to_string());
                }
                _ => break,
            }
        }

        debug!("Listed {} objects under {}", keys.len(), prefix);
        Ok(keys)
    }

    async fn upload(&self, local: &Path, key: &str) -> Result<()> {
        let len = tokio::fs::metadata(local).await?.len();
        if len >= MULTIPART_THRESHOLD {
            self.put_multipart(local, key, len).await?;
        } else {
            self.put_single(local, key).await?;
        }

        info!(
            "Uploaded {} ({} bytes) to {}",
            local.display(),
            len,
            self.object_uri(key)
        );
        Ok(())
    }

    async fn download(&self, key: &str, local: &Path) -> Result<()> {
        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                PipelineError::external(
                    COLLABORATOR,
                    format!("download {}", self.object_uri(key)),
                    DisplayErrorContext(e),
                )
            })?;

        let mut file = tokio::fs::File::create(local).await?;
        let mut body = resp.body.into_async_read();
        let written = stream_to_file(&mut body, &mut file).await.map_err(|e| {
            PipelineError::external(
                COLLABORATOR,
                format!("read body of {}", self.object_uri(key)),
                e,
            )
        })?;

        info!(
            "Downloaded {} ({} bytes) to {}",
            self.object_uri(key),
            written,
            local.display()
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                PipelineError::external(
                    COLLABORATOR,
                    format!("delete {}", self.object_uri(key)),
                    DisplayErrorContext(e),
                )
            })?;

        debug!("Deleted {}", self.object_uri(key));
        Ok(())
    }

    fn object_uri(&self, key: &str) -> String {
        format!("s3://{}/{}", self.bucket, key)
    }
}
