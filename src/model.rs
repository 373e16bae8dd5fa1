//! BLIP image-captioning model: one-time load and per-request generation.

use std::sync::Mutex;

use anyhow::{Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::generation::LogitsProcessor;
use candle_transformers::models::blip;
use hf_hub::api::sync::Api;
use image::imageops::FilterType;
use image::DynamicImage;
use tokenizers::Tokenizer;

const MODEL_ID: &str = "Salesforce/blip-image-captioning-large";

const IMAGE_SIZE: usize = 384;
const MAX_CAPTION_TOKENS: usize = 50;
const TEMPERATURE: f64 = 0.7;
const REPEAT_PENALTY: f32 = 1.5;
const SEED: u64 = 299792458;

/// BLIP text decoder start token; generation stops at SEP.
const BOS_TOKEN_ID: u32 = 30522;
const SEP_TOKEN_ID: u32 = 102;

/// Loaded once at startup and shared read-only across requests. The decoder
/// keeps a KV cache between forward passes, so generation serializes on an
/// internal mutex and resets the cache per caption.
pub struct CaptionModel {
    model: Mutex<blip::BlipForConditionalGeneration>,
    tokenizer: Tokenizer,
    device: Device,
}

impl CaptionModel {
    /// Downloads (or reuses the hub cache for) the pretrained weights and
    /// tokenizer, then loads them onto the selected device. Blocking.
    pub fn load() -> Result<Self> {
        let device = select_device()?;
        tracing::info!(device = ?device, model = MODEL_ID, "loading caption model");

        let repo = Api::new()
            .context("failed to initialize hub client")?
            .model(MODEL_ID.to_string());
        let weights = repo
            .get("model.safetensors")
            .context("failed to fetch model weights")?;
        let tokenizer_file = repo
            .get("tokenizer.json")
            .context("failed to fetch tokenizer")?;

        let tokenizer = Tokenizer::from_file(tokenizer_file).map_err(anyhow::Error::msg)?;
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[weights], DType::F32, &device)? };
        let config = blip::Config::image_captioning_large();
        let model = blip::BlipForConditionalGeneration::new(&config, vb)?;

        tracing::info!("caption model ready");
        Ok(Self {
            model: Mutex::new(model),
            tokenizer,
            device,
        })
    }

    /// Generates a raw English caption for the image. Runs a full forward
    /// pass per token; callers should invoke this from a blocking context.
    pub fn caption(&self, img: &DynamicImage) -> Result<String> {
        let pixels = image_tensor(img, &Device::Cpu)?.to_device(&self.device)?;

        let mut model = self.model.lock().expect("caption model lock poisoned");
        model.reset_kv_cache();

        let image_embeds = pixels.unsqueeze(0)?.apply(model.vision_model())?;

        let mut logits_processor = LogitsProcessor::new(SEED, Some(TEMPERATURE), None);
        let mut token_ids = vec![BOS_TOKEN_ID];
        for index in 0..MAX_CAPTION_TOKENS {
            // After the first pass only the newest token is fed; the rest
            // lives in the decoder KV cache.
            let context_size = if index > 0 { 1 } else { token_ids.len() };
            let start_pos = token_ids.len().saturating_sub(context_size);
            let input_ids = Tensor::new(&token_ids[start_pos..], &self.device)?.unsqueeze(0)?;

            let logits = model.text_decoder().forward(&input_ids, &image_embeds)?;
            let logits = logits.squeeze(0)?;
            let logits = logits.get(logits.dim(0)? - 1)?;
            let logits =
                candle_transformers::utils::apply_repeat_penalty(&logits, REPEAT_PENALTY, &token_ids)?;

            let token = logits_processor.sample(&logits)?;
            if token == SEP_TOKEN_ID {
                break;
            }
            token_ids.push(token);
        }

        let caption = self
            .tokenizer
            .decode(&token_ids[1..], true)
            .map_err(anyhow::Error::msg)?;
        Ok(caption)
    }
}

fn select_device() -> Result<Device> {
    if candle_core::utils::cuda_is_available() {
        Ok(Device::new_cuda(0)?)
    } else if candle_core::utils::metal_is_available() {
        Ok(Device::new_metal(0)?)
    } else {
        Ok(Device::Cpu)
    }
}

/// Converts a decoded image into the model's input tensor: RGB,
/// resize-to-fill 384x384, CHW, scaled to [0,1] and CLIP-normalized.
fn image_tensor(img: &DynamicImage, device: &Device) -> Result<Tensor> {
    let img = img
        .resize_to_fill(IMAGE_SIZE as u32, IMAGE_SIZE as u32, FilterType::Triangle)
        .to_rgb8();
    let data = Tensor::from_vec(img.into_raw(), (IMAGE_SIZE, IMAGE_SIZE, 3), device)?
        .permute((2, 0, 1))?;
    let mean =
        Tensor::new(&[0.48145466f32, 0.4578275, 0.40821073], device)?.reshape((3, 1, 1))?;
    let std =
        Tensor::new(&[0.26862954f32, 0.26130258, 0.27577711], device)?.reshape((3, 1, 1))?;
    let normalized = (data.to_dtype(DType::F32)? / 255.)?
        .broadcast_sub(&mean)?
        .broadcast_div(&std)?;
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_tensor_has_model_shape() {
        let img = DynamicImage::new_rgb8(100, 50);
        let tensor = image_tensor(&img, &Device::Cpu).unwrap();
        assert_eq!(tensor.dims(), &[3, IMAGE_SIZE, IMAGE_SIZE]);
        assert_eq!(tensor.dtype(), DType::F32);
    }

    #[test]
    fn image_tensor_accepts_non_rgb_input() {
        let img = DynamicImage::new_luma8(64, 64);
        let tensor = image_tensor(&img, &Device::Cpu).unwrap();
        assert_eq!(tensor.dims(), &[3, IMAGE_SIZE, IMAGE_SIZE]);
    }
}
