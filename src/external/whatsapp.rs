use crate::config::ReportConfig;
use crate::error::{AppError, AppResult};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct GatewayResponse {
    #[serde(default)]
    pub status: bool,
    pub reason: Option<String>,
}

/// Klien gateway WhatsApp (API bergaya Fonnte: POST form `target` + `message`,
/// token di header `Authorization`).
#[derive(Clone)]
pub struct WhatsAppClient {
    client: Client,
    config: ReportConfig,
}

impl WhatsAppClient {
    pub fn new(config: ReportConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self { client, config }
    }

    pub fn targets(&self) -> &[String] {
        &self.config.targets
    }

    pub async fn send_message(&self, target: &str, message: &str) -> AppResult<()> {
        if self.config.api_token.is_empty() {
            return Err(AppError::ConfigError(
                "Token API WhatsApp belum dikonfigurasi".into(),
            ));
        }

        let params = [("target", target), ("message", message)];
        let response = self
            .client
            .post(&self.config.api_url)
            .header(reqwest::header::AUTHORIZATION, &self.config.api_token)
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            log::error!("WhatsApp message to {target} failed: {error_text}");
            return Err(AppError::ExternalApiError(format!(
                "Gagal mengirim pesan WhatsApp: {error_text}"
            )));
        }

        // gateway bisa membalas 200 dengan status false
        let body: GatewayResponse = response.json().await?;
        if !body.status {
            let reason = body.reason.unwrap_or_else(|| "tanpa keterangan".into());
            log::error!("WhatsApp gateway rejected message to {target}: {reason}");
            return Err(AppError::ExternalApiError(format!(
                "Gateway menolak pesan: {reason}"
            )));
        }

        log::info!("WhatsApp message sent to {target}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_token_is_config_error() {
        let client = WhatsAppClient::new(ReportConfig::default());
        let res = client.send_message("08123456789", "halo").await;
        assert!(matches!(res, Err(AppError::ConfigError(_))));
    }

    #[test]
    fn test_gateway_response_parses() {
        let ok: GatewayResponse = serde_json::from_str(r#"{"status":true,"id":["1"]}"#).unwrap();
        assert!(ok.status);
        let bad: GatewayResponse =
            serde_json::from_str(r#"{"status":false,"reason":"invalid token"}"#).unwrap();
        assert_eq!(bad.reason.as_deref(), Some("invalid token"));
    }
}
