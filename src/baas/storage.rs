use tracing::info;

use super::{BaasClient, BaasError, KeyKind};

impl BaasClient {
    /// Uploads an object into the configured bucket without overwriting.
    pub async fn upload_object(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), BaasError> {
        let request = self
            .post(&format!("/storage/v1/object/{}/{}", self.bucket(), path), KeyKind::ServiceRole)
            .header("Content-Type", content_type)
            .header("x-upsert", "false")
            .body(bytes);

        self.send(request, "storage upload").await?;
        info!("Uploaded object {}/{}", self.bucket(), path);
        Ok(())
    }

    pub fn public_object_url(&self, path: &str) -> String {
        format!("{}/storage/v1/object/public/{}/{}", self.base_url(), self.bucket(), path)
    }
}

#[cfg(test)]
mod tests {
    use crate::baas::BaasClient;
    use crate::config::BaasConfig;
    use std::time::Duration;

    #[test]
    fn test_public_object_url() {
        let client = BaasClient::new(BaasConfig {
            url: "https://project.supabase.co".to_string(),
            anon_key: "anon".to_string(),
            service_role_key: "service".to_string(),
            storage_bucket: "attachments".to_string(),
            timeout: Duration::from_secs(5),
        })
        .expect("client should build");

        assert_eq!(
            client.public_object_url("posts/1700000000000-abc123.png"),
            "https://project.supabase.co/storage/v1/object/public/attachments/posts/1700000000000-abc123.png"
        );
    }
}
