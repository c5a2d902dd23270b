use crate::error::PipelineError;
use crate::types::{BoundingBox, Confidence, DetectionSet, EncodedImage, PlateDetection};
use futures::future::BoxFuture;
use log::{debug, warn};
use serde_json::{json, Value};
use std::env;
use url::Url;

const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-3-flash-preview";

const PROMPT: &str = "Analyze this image and identify ALL vehicle license plates (number plates) visible.\n\n\
For each plate detected, provide:\n\
1. plateNumber: The exact alphanumeric characters on the plate.\n\
2. confidence: \"high\", \"medium\", or \"low\".\n\
3. vehicleType: e.g., Sedan, SUV, Truck, Bus, Motorcycle.\n\
4. vehicleModel: Specific make and model if identifiable (e.g., Toyota Camry).\n\
5. color: Primary color of the vehicle.\n\
6. region: State or country of the plate.\n\
7. ownerName: Identify or simulate a plausible owner name for this vehicle.\n\
8. registrationDate: Identify or simulate a plausible registration date.\n\
9. plateBoundingBox: CRITICAL - Provide the precise normalized bounding box [ymin, xmin, ymax, xmax] where each value is between 0 and 1000. Ensure the box tightly encloses ONLY the license plate itself.\n\n\
Return the result as a JSON object with a \"plates\" array.";

/// Anything that can turn an encoded image into a set of plate detections.
/// The pipeline controller only ever talks to this trait; the production
/// implementation is `GeminiClient`.
pub trait Recognizer: Send + Sync {
    fn detect<'a>(
        &'a self,
        image: &'a EncodedImage,
    ) -> BoxFuture<'a, Result<DetectionSet, PipelineError>>;
}

/// Client for a multimodal recognition model speaking the `generateContent`
/// protocol. The request pins a structured-output schema, and the response is
/// still validated field by field; the schema is a contract, not a promise.
pub struct GeminiClient {
    http: reqwest::Client,
    endpoint: Url,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(endpoint: Url, api_key: String, model: String) -> GeminiClient {
        GeminiClient {
            http: reqwest::Client::new(),
            endpoint,
            api_key,
            model,
        }
    }

    /// Reads GEMINI_API_KEY (required) plus optional GEMINI_ENDPOINT and
    /// GEMINI_MODEL overrides.
    pub fn from_env() -> Result<GeminiClient, PipelineError> {
        let api_key = env::var("GEMINI_API_KEY").map_err(|_| {
            PipelineError::RecognitionFailure("GEMINI_API_KEY environment variable unset".to_string())
        })?;
        let endpoint = env::var("GEMINI_ENDPOINT").unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());
        let endpoint = Url::parse(&endpoint).map_err(|e| {
            PipelineError::RecognitionFailure(format!("invalid endpoint {}: {}", endpoint, e))
        })?;
        let model = env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        Ok(GeminiClient::new(endpoint, api_key, model))
    }

    fn request_url(&self) -> Result<Url, PipelineError> {
        let raw = format!(
            "{}/models/{}:generateContent",
            self.endpoint.as_str().trim_end_matches('/'),
            self.model
        );
        Url::parse(&raw)
            .map_err(|e| PipelineError::RecognitionFailure(format!("invalid request url {}: {}", raw, e)))
    }

    fn request_body(&self, image: &EncodedImage) -> Value {
        json!({
            "contents": [{
                "parts": [
                    { "text": PROMPT },
                    {
                        "inline_data": {
                            "mime_type": image.mime_type(),
                            "data": base64::encode(image.data()),
                        }
                    },
                ],
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": response_schema(),
            },
        })
    }

    async fn detect_impl(&self, image: &EncodedImage) -> Result<DetectionSet, PipelineError> {
        let url = self.request_url()?;
        debug!("Submitting {:?} to {}", image, url);
        let response = self
            .http
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(&self.request_body(image))
            .send()
            .await
            .map_err(|e| PipelineError::RecognitionFailure(format!("request failed: {}", e)))?;
        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::RecognitionFailure(format!(
                "service returned {}",
                status
            )));
        }
        let payload: Value = response.json().await.map_err(|e| {
            PipelineError::RecognitionFailure(format!("unparsable response body: {}", e))
        })?;
        let text = payload["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .ok_or_else(|| {
                PipelineError::RecognitionFailure("response has no candidate text".to_string())
            })?;
        let result: Value = serde_json::from_str(text).map_err(|e| {
            PipelineError::RecognitionFailure(format!("candidate text is not JSON: {}", e))
        })?;
        parse_detection_set(&result)
    }
}

impl Recognizer for GeminiClient {
    fn detect<'a>(
        &'a self,
        image: &'a EncodedImage,
    ) -> BoxFuture<'a, Result<DetectionSet, PipelineError>> {
        Box::pin(self.detect_impl(image))
    }
}

/// The structured-output schema sent with every request: an object with a
/// `plates` array whose elements require plateNumber, confidence and
/// plateBoundingBox and may carry descriptive strings.
fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "plates": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "plateNumber": { "type": "STRING" },
                        "confidence": { "type": "STRING", "enum": ["high", "medium", "low"] },
                        "vehicleType": { "type": "STRING" },
                        "vehicleModel": { "type": "STRING" },
                        "color": { "type": "STRING" },
                        "region": { "type": "STRING" },
                        "ownerName": { "type": "STRING" },
                        "registrationDate": { "type": "STRING" },
                        "plateBoundingBox": {
                            "type": "OBJECT",
                            "properties": {
                                "ymin": { "type": "NUMBER" },
                                "xmin": { "type": "NUMBER" },
                                "ymax": { "type": "NUMBER" },
                                "xmax": { "type": "NUMBER" },
                            },
                            "required": ["ymin", "xmin", "ymax", "xmax"],
                        },
                    },
                    "required": ["plateNumber", "confidence", "plateBoundingBox"],
                },
            },
        },
        "required": ["plates"],
    })
}

/// Strict validation of the model's answer. A missing `plates` wrapper fails
/// the whole call; a bad element only loses that element. All elements
/// invalid (or none returned) is a successful empty set, since zero
/// detections is a legitimate outcome.
fn parse_detection_set(value: &Value) -> Result<DetectionSet, PipelineError> {
    let entries = value["plates"].as_array().ok_or_else(|| {
        PipelineError::SchemaViolation("response has no plates array".to_string())
    })?;
    let mut plates = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        match parse_plate(entry) {
            Ok(plate) => plates.push(plate),
            Err(e) => warn!("Dropping detection {}: {}", index, e),
        }
    }
    Ok(DetectionSet { plates })
}

fn parse_plate(entry: &Value) -> Result<PlateDetection, PipelineError> {
    let plate_number = entry["plateNumber"]
        .as_str()
        .ok_or_else(|| PipelineError::SchemaViolation("missing plateNumber".to_string()))?;
    if plate_number.is_empty() {
        return Err(PipelineError::SchemaViolation("empty plateNumber".to_string()));
    }
    let confidence = entry["confidence"]
        .as_str()
        .map(Confidence::from_label)
        .ok_or_else(|| PipelineError::SchemaViolation("missing confidence".to_string()))?;
    let bb = &entry["plateBoundingBox"];
    let bounding_box = BoundingBox::new(
        box_field(bb, "ymin")?,
        box_field(bb, "xmin")?,
        box_field(bb, "ymax")?,
        box_field(bb, "xmax")?,
    )?;
    Ok(PlateDetection {
        plate_number: plate_number.to_string(),
        confidence,
        bounding_box,
        vehicle_type: optional_str(entry, "vehicleType"),
        vehicle_model: optional_str(entry, "vehicleModel"),
        color: optional_str(entry, "color"),
        region: optional_str(entry, "region"),
        owner_name: optional_str(entry, "ownerName"),
        registration_date: optional_str(entry, "registrationDate"),
    })
}

fn box_field(bb: &Value, name: &str) -> Result<f64, PipelineError> {
    bb[name].as_f64().ok_or_else(|| {
        PipelineError::SchemaViolation(format!("plateBoundingBox missing {}", name))
    })
}

fn optional_str(entry: &Value, name: &str) -> Option<String> {
    entry[name].as_str().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_plate() -> Value {
        json!({
            "plateNumber": "KA01AB1234",
            "confidence": "high",
            "vehicleType": "Sedan",
            "plateBoundingBox": { "ymin": 100, "xmin": 200, "ymax": 200, "xmax": 600 },
        })
    }

    #[test]
    fn parses_a_well_formed_response() {
        let set = parse_detection_set(&json!({ "plates": [valid_plate()] })).unwrap();
        assert_eq!(set.len(), 1);
        let plate = &set.plates[0];
        assert_eq!(plate.plate_number, "KA01AB1234");
        assert_eq!(plate.confidence, Confidence::High);
        assert_eq!(plate.vehicle_type.as_deref(), Some("Sedan"));
        assert_eq!(plate.vehicle_model, None);
        assert_eq!(plate.bounding_box.xmax(), 600.0);
    }

    #[test]
    fn keeps_service_order() {
        let mut second = valid_plate();
        second["plateNumber"] = json!("ZZ99ZZ9999");
        let set = parse_detection_set(&json!({ "plates": [valid_plate(), second] })).unwrap();
        assert_eq!(set.plates[0].plate_number, "KA01AB1234");
        assert_eq!(set.plates[1].plate_number, "ZZ99ZZ9999");
    }

    #[test]
    fn missing_wrapper_is_a_schema_violation() {
        assert!(matches!(
            parse_detection_set(&json!({ "results": [] })),
            Err(PipelineError::SchemaViolation(_))
        ));
        assert!(matches!(
            parse_detection_set(&json!({ "plates": "yes" })),
            Err(PipelineError::SchemaViolation(_))
        ));
    }

    #[test]
    fn invalid_element_is_dropped_not_fatal() {
        let missing_number = json!({
            "confidence": "high",
            "plateBoundingBox": { "ymin": 0, "xmin": 0, "ymax": 10, "xmax": 10 },
        });
        let set =
            parse_detection_set(&json!({ "plates": [missing_number, valid_plate()] })).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.plates[0].plate_number, "KA01AB1234");
    }

    #[test]
    fn all_invalid_elements_yield_empty_success() {
        let mut inverted = valid_plate();
        inverted["plateBoundingBox"] = json!({ "ymin": 300, "xmin": 0, "ymax": 100, "xmax": 10 });
        let mut empty_number = valid_plate();
        empty_number["plateNumber"] = json!("");
        let set = parse_detection_set(&json!({ "plates": [inverted, empty_number] })).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn zero_detections_is_success() {
        let set = parse_detection_set(&json!({ "plates": [] })).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn unknown_confidence_is_coerced_to_low() {
        let mut plate = valid_plate();
        plate["confidence"] = json!("very-high");
        let set = parse_detection_set(&json!({ "plates": [plate] })).unwrap();
        assert_eq!(set.plates[0].confidence, Confidence::Low);
    }

    #[test]
    fn missing_confidence_drops_the_element() {
        let mut plate = valid_plate();
        plate.as_object_mut().unwrap().remove("confidence");
        let set = parse_detection_set(&json!({ "plates": [plate] })).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn incomplete_bounding_box_drops_the_element() {
        let mut plate = valid_plate();
        plate["plateBoundingBox"] = json!({ "ymin": 100, "xmin": 200, "ymax": 200 });
        let set = parse_detection_set(&json!({ "plates": [plate] })).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn request_body_carries_image_and_schema() {
        let client = GeminiClient::new(
            Url::parse("https://example.test/v1beta").unwrap(),
            "key".to_string(),
            "model".to_string(),
        );
        let image = EncodedImage::new(vec![1, 2, 3], "image/jpeg");
        let body = client.request_body(&image);
        let part = &body["contents"][0]["parts"][1]["inline_data"];
        assert_eq!(part["mime_type"], "image/jpeg");
        assert_eq!(part["data"], base64::encode(&[1u8, 2, 3]));
        assert_eq!(
            body["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert_eq!(
            body["generationConfig"]["responseSchema"]["required"][0],
            "plates"
        );
    }

    #[test]
    fn request_url_targets_the_model() {
        let client = GeminiClient::new(
            Url::parse("https://example.test/v1beta/").unwrap(),
            "key".to_string(),
            "shiny".to_string(),
        );
        assert_eq!(
            client.request_url().unwrap().as_str(),
            "https://example.test/v1beta/models/shiny:generateContent"
        );
    }
}
