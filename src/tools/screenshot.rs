use crate::error::{BrowserError, Result};
use crate::expectation::{ImageFormat, ResolvedImageOptions};
use crate::tools::{Attachment, Tool, ToolContext, ToolResult};
use base64::{Engine as _, engine::general_purpose};
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageOutputFormat};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::io::Cursor;

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ScreenshotParams {}

/// Screenshot of the viewport, returned as an image attachment
#[derive(Default)]
pub struct ScreenshotTool;

#[async_trait::async_trait]
impl Tool for ScreenshotTool {
    type Params = ScreenshotParams;

    fn name(&self) -> &str {
        "take_screenshot"
    }

    async fn execute_typed(&self, _params: ScreenshotParams, context: &mut ToolContext<'_>) -> Result<ToolResult> {
        let engine = context.page.engine().clone();
        let png = engine.screenshot().await?;

        let options = context.expectation.image.clone();
        let image = tokio::task::spawn_blocking(move || shape_image(&png, &options))
            .await
            .map_err(|e| BrowserError::ToolExecutionFailed {
                tool: "take_screenshot".to_string(),
                reason: e.to_string(),
            })??;

        let (mime_type, kind) = match image.format {
            ImageFormat::Png => ("image/png", "png"),
            ImageFormat::Jpeg => ("image/jpeg", "jpeg"),
        };
        context.add_attachment(Attachment {
            mime_type: mime_type.to_string(),
            data: general_purpose::STANDARD.encode(&image.bytes),
        });
        context.add_code(format!("await page.screenshot({{ type: '{}' }});", kind));

        Ok(ToolResult::success_with(serde_json::json!({
            "width": image.width,
            "height": image.height,
            "format": kind,
            "bytes": image.bytes.len(),
        }))
        .with_text(format!(
            "Took a {}x{} {} screenshot of the viewport",
            image.width, image.height, kind
        )))
    }
}

/// Encoded screenshot after shaping
#[derive(Debug)]
pub struct ShapedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
}

/// Downscale into `max_width` x `max_height` keeping the aspect ratio, then
/// encode as PNG or JPEG. An untouched PNG is passed through as is.
pub fn shape_image(png: &[u8], options: &ResolvedImageOptions) -> Result<ShapedImage> {
    let decoded = image::load_from_memory(png)
        .map_err(|e| BrowserError::TabOperationFailed(format!("Failed to decode screenshot: {}", e)))?;
    let (width, height) = decoded.dimensions();

    let max_width = options.max_width.unwrap_or(width).max(1);
    let max_height = options.max_height.unwrap_or(height).max(1);
    let needs_resize = width > max_width || height > max_height;

    if !needs_resize && options.format == ImageFormat::Png {
        return Ok(ShapedImage {
            bytes: png.to_vec(),
            width,
            height,
            format: ImageFormat::Png,
        });
    }

    let shaped = if needs_resize {
        decoded.resize(max_width, max_height, FilterType::Lanczos3)
    } else {
        decoded
    };
    let (width, height) = shaped.dimensions();

    let mut bytes = Vec::new();
    let encoded = match options.format {
        ImageFormat::Png => shaped.write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png),
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(shaped.to_rgb8())
            .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Jpeg(options.quality)),
    };
    encoded.map_err(|e| BrowserError::TabOperationFailed(format!("Failed to encode screenshot: {}", e)))?;

    Ok(ShapedImage {
        bytes,
        width,
        height,
        format: options.format,
    })
}
