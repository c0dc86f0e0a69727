use crate::categories::CategoryBook;
use crate::error::{FinancePlannerError, Result};
use crate::llm::client::ChatClient;
use crate::llm::prompts::{receipt_user_prompt, SYSTEM_PROMPT_RECEIPT};
use crate::llm::types::{ChatMessage, ToolDefinition};
use crate::schema::Receipt;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use log::{debug, info};
use std::path::Path;
use tokio::fs;

pub const MAX_IMAGE_BYTES: usize = 8 * 1024 * 1024;

/// Reads receipt photos with a vision-capable model.
pub struct ReceiptReader {
    client: ChatClient,
}

impl ReceiptReader {
    pub fn new(client: ChatClient) -> Self {
        Self { client }
    }

    pub async fn read(&self, bytes: &[u8], mime_type: &str, book: &CategoryBook) -> Result<Receipt> {
        if !mime_type.starts_with("image/") {
            return Err(FinancePlannerError::InvalidInput(format!(
                "receipt must be an image, got {}",
                mime_type
            )));
        }
        if bytes.is_empty() || bytes.len() > MAX_IMAGE_BYTES {
            return Err(FinancePlannerError::InvalidInput(format!(
                "receipt image must be between 1 byte and {} bytes, got {}",
                MAX_IMAGE_BYTES,
                bytes.len()
            )));
        }

        let data_url = format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes));
        let tool = ToolDefinition::from_schema::<Receipt>(
            "record_receipt",
            "Record the fields read from the receipt",
        )?;
        let messages = [
            ChatMessage::system(SYSTEM_PROMPT_RECEIPT),
            ChatMessage::user_with_image(receipt_user_prompt(&book.prompt_listing()), data_url),
        ];

        let value = self.client.complete_with_tool(&messages, &tool).await?;
        let mut receipt: Receipt = serde_json::from_value(value.clone()).map_err(|_| {
            FinancePlannerError::UnparseableResponse {
                raw: value.to_string(),
            }
        })?;

        if let Some(id) = &receipt.suggested_category_id {
            if !book.contains(id) {
                debug!("Dropping unknown suggested category '{}'", id);
                receipt.suggested_category_id = None;
            }
        }

        info!(
            "Read receipt from {} dated {} totalling {:.2}",
            receipt.merchant, receipt.date, receipt.total
        );
        Ok(receipt)
    }

    pub async fn read_file(&self, path: &Path, book: &CategoryBook) -> Result<Receipt> {
        let mime_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .to_string();
        let bytes = fs::read(path).await?;
        self.read(&bytes, &mime_type, book).await
    }
}
