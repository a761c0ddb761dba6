use anyhow::Context;
use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use qrcode::{QrCode, render::svg};
use uuid::Uuid;

/// Tag prefixed to every scannable payload so door scanners can reject
/// foreign codes.
pub const QR_NAMESPACE: &str = "EVENT360";

pub const QR_CONTENT_TYPE: &str = "image/svg+xml";

/// Durable storage for rendered images. Returns a URL the client can load.
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn store(&self, bytes: Vec<u8>, content_type: &str) -> anyhow::Result<String>;
}

/// Inlines images as `data:` URLs, so no external host is required.
#[derive(Debug, Default, Clone, Copy)]
pub struct DataUrlImageStore;

#[async_trait]
impl ImageStore for DataUrlImageStore {
    async fn store(&self, bytes: Vec<u8>, content_type: &str) -> anyhow::Result<String> {
        Ok(format!("data:{content_type};base64,{}", STANDARD.encode(bytes)))
    }
}

pub fn ticket_payload(ticket_code: &str, event_id: Uuid, ticket_id: Uuid) -> String {
    format!("{QR_NAMESPACE}:{ticket_code}:{event_id}:{ticket_id}")
}

pub fn render_svg(payload: &str) -> anyhow::Result<Vec<u8>> {
    let code = QrCode::new(payload.as_bytes()).context("payload does not fit in a QR code")?;
    let image = code
        .render::<svg::Color>()
        .min_dimensions(240, 240)
        .quiet_zone(true)
        .dark_color(svg::Color("#000000"))
        .light_color(svg::Color("#ffffff"))
        .build();
    Ok(image.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_carries_namespace_code_event_and_ticket() {
        let event_id = Uuid::new_v4();
        let ticket_id = Uuid::new_v4();
        let payload = ticket_payload("TKT-ABCDEF123456", event_id, ticket_id);

        let event = event_id.to_string();
        let ticket = ticket_id.to_string();
        let parts: Vec<&str> = payload.split(':').collect();
        assert_eq!(parts, vec![QR_NAMESPACE, "TKT-ABCDEF123456", event.as_str(), ticket.as_str()]);
    }

    #[test]
    fn renders_an_svg_document() {
        let svg = render_svg(&ticket_payload("TKT-000000000001", Uuid::nil(), Uuid::nil())).unwrap();
        let text = String::from_utf8(svg).unwrap();
        assert!(text.contains("<svg"));
    }

    #[tokio::test]
    async fn data_url_store_inlines_the_image() {
        let url = DataUrlImageStore
            .store(b"<svg/>".to_vec(), QR_CONTENT_TYPE)
            .await
            .unwrap();
        assert_eq!(url, "data:image/svg+xml;base64,PHN2Zy8+");
    }
}
