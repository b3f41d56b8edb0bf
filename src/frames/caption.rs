//! Frame captioning through a vision model.

use super::FrameSample;
use crate::config::CaptioningSettings;
use crate::error::{Result, VidloreError};
use crate::openai::create_compatible_client;
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestMessageContentPartImageArgs, ChatCompletionRequestMessageContentPartTextArgs,
    ChatCompletionRequestUserMessageArgs, ChatCompletionRequestUserMessageContent,
    CreateChatCompletionRequestArgs, ImageDetail, ImageUrlArgs,
};
use async_openai::Client;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// A sampled frame after captioning; the image bytes are gone by now.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionedFrame {
    pub timestamp: f64,
    /// `None` when captioning is disabled or failed for this frame.
    pub caption: Option<String>,
}

/// Describes a single frame in natural language.
#[async_trait]
pub trait FrameCaptioner: Send + Sync {
    fn name(&self) -> &str;

    async fn caption(&self, frame: &FrameSample) -> Result<String>;
}

/// Caption every frame in order, consuming the images.
///
/// A failed caption is logged and leaves that frame's caption empty.
pub async fn caption_frames(
    captioner: Option<&dyn FrameCaptioner>,
    frames: Vec<FrameSample>,
) -> Vec<CaptionedFrame> {
    let Some(captioner) = captioner else {
        return frames
            .into_iter()
            .map(|frame| CaptionedFrame {
                timestamp: frame.timestamp,
                caption: None,
            })
            .collect();
    };

    info!("Captioning {} frames with {}", frames.len(), captioner.name());
    let mut captioned = Vec::with_capacity(frames.len());
    for frame in frames {
        let caption = match captioner.caption(&frame).await {
            Ok(text) => {
                let text = text.trim().to_string();
                debug!("[{:.1}s] {}", frame.timestamp, text);
                Some(text).filter(|t| !t.is_empty())
            }
            Err(e) => {
                warn!("Captioning frame at {:.1}s failed: {}", frame.timestamp, e);
                None
            }
        };
        captioned.push(CaptionedFrame {
            timestamp: frame.timestamp,
            caption,
        });
    }
    captioned
}

/// Vision-language model behind an OpenAI-compatible chat endpoint.
pub struct VisionCaptioner {
    client: Client<OpenAIConfig>,
    model: String,
    prompt: String,
    max_tokens: u32,
}

impl VisionCaptioner {
    pub fn new(client: Client<OpenAIConfig>, model: &str, prompt: &str, max_tokens: u32) -> Self {
        Self {
            client,
            model: model.to_string(),
            prompt: prompt.to_string(),
            max_tokens,
        }
    }

    /// Build from settings; `Ok(None)` when captioning is off or no API key is set.
    pub fn from_settings(settings: &CaptioningSettings) -> Result<Option<Self>> {
        if !settings.enabled {
            return Ok(None);
        }
        let Some(api_key) = settings.api_key() else {
            warn!(
                "{} not set; frames will be sampled without captions",
                settings.api_key_env
            );
            return Ok(None);
        };

        let client = create_compatible_client(&settings.api_base, &api_key)?;
        Ok(Some(Self::new(
            client,
            &settings.model,
            &settings.prompt,
            settings.max_tokens,
        )))
    }
}

/// `data:` URL carrying a JPEG frame.
pub(crate) fn jpeg_data_url(image: &[u8]) -> String {
    format!("data:image/jpeg;base64,{}", STANDARD.encode(image))
}

#[async_trait]
impl FrameCaptioner for VisionCaptioner {
    fn name(&self) -> &str {
        &self.model
    }

    async fn caption(&self, frame: &FrameSample) -> Result<String> {
        let build_err = |e: async_openai::error::OpenAIError| VidloreError::Captioning(e.to_string());

        let text = ChatCompletionRequestMessageContentPartTextArgs::default()
            .text(self.prompt.clone())
            .build()
            .map_err(build_err)?;
        let image = ChatCompletionRequestMessageContentPartImageArgs::default()
            .image_url(
                ImageUrlArgs::default()
                    .url(jpeg_data_url(&frame.image))
                    .detail(ImageDetail::Auto)
                    .build()
                    .map_err(build_err)?,
            )
            .build()
            .map_err(build_err)?;

        let message = ChatCompletionRequestUserMessageArgs::default()
            .content(ChatCompletionRequestUserMessageContent::Array(vec![
                text.into(),
                image.into(),
            ]))
            .build()
            .map_err(build_err)?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(vec![message.into()])
            .max_tokens(self.max_tokens)
            .build()
            .map_err(build_err)?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| VidloreError::OpenAI(format!("Vision model error: {}", e)))?;

        response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| VidloreError::Captioning("Empty response from vision model".to_string()))
    }
}
