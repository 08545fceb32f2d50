//! Prompts and the response schema for question extraction.
//!
//! Everything the model is told lives here so the wording can change without
//! touching request or error-handling code in [`crate::pipeline::llm`].
//! Callers can replace the system instruction via
//! [`crate::config::ConversionConfig::system_prompt`].
//!
//! The prompts are in Vietnamese: the model answers in the language it is
//! instructed in, and the decks are for Vietnamese classrooms.

use serde_json::{json, Value};

/// Default system instruction for extracting questions from a document.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"Bạn là chuyên gia trích xuất dữ liệu học liệu chính xác 100%.

RÀNG BUỘC NGHIÊM NGẶT:
1. KHÔNG BỎ SÓT: Trích xuất TOÀN BỘ các câu hỏi có trong tài liệu. Nếu tài liệu có 50 câu, phải trả về đúng 50 câu. Tuyệt đối không được tóm tắt hoặc lược bỏ.
2. GIỮ NGUYÊN NỘI DUNG: Không thay đổi nội dung câu hỏi. Giữ đúng ngữ pháp và ý nghĩa gốc của giáo viên.
3. NHẬN DIỆN ĐÁP ÁN: Tìm đáp án đúng dựa trên mọi dấu hiệu (gạch chân, in đậm, màu sắc, hoặc ký hiệu [x]) trong file gốc.
4. CÔNG THỨC UNICODE: Chuyển toàn bộ công thức hóa học/toán học sang Unicode chuẩn (ví dụ: CH₃-C≡CH, √x, ∫, ∆...).
5. LÀM SẠCH: Xóa bỏ các ký tự rác, các đường kẻ ngang thừa, hoặc các dấu gạch chân (_) không cần thiết trong văn bản.
6. PHÂN LOẠI:
   - Trắc nghiệm (multiple_choice)
   - Đúng/Sai (true_false)
   - Trả lời ngắn/Tự luận (short_answer)

TRẢ VỀ: Chỉ JSON theo đúng schema."#;

/// User-turn instruction sent alongside the document payload.
pub const USER_INSTRUCTION: &str = "Hãy trích xuất TOÀN BỘ câu hỏi trong file này. Đảm bảo số lượng slide tạo ra khớp hoàn toàn với số lượng câu hỏi trong file nguồn. Không bỏ sót bất kỳ câu nào.";

/// Gemini `responseSchema` constraining the answer to an extraction result.
///
/// Field names match the wire form in [`crate::quiz`].
pub fn response_schema() -> Value {
    let choice = json!({
        "type": "OBJECT",
        "properties": {
            "label": { "type": "STRING" },
            "text": { "type": "STRING" },
            "isCorrect": { "type": "BOOLEAN" }
        }
    });

    json!({
        "type": "OBJECT",
        "properties": {
            "title": { "type": "STRING" },
            "slides": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "id": { "type": "STRING" },
                        "type": {
                            "type": "STRING",
                            "enum": ["multiple_choice", "true_false", "short_answer"]
                        },
                        "question": { "type": "STRING" },
                        "options": { "type": "ARRAY", "items": choice.clone() },
                        "trueFalseParts": { "type": "ARRAY", "items": choice },
                        "shortAnswer": { "type": "STRING" }
                    },
                    "required": ["id", "type", "question"]
                }
            }
        },
        "required": ["title", "slides"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_requires_title_and_slides() {
        let schema = response_schema();
        assert_eq!(schema["required"], json!(["title", "slides"]));
        let item = &schema["properties"]["slides"]["items"];
        assert_eq!(item["required"], json!(["id", "type", "question"]));
        assert!(item["properties"]["trueFalseParts"].is_object());
    }

    #[test]
    fn schema_limits_kind_to_known_values() {
        let schema = response_schema();
        let kind = &schema["properties"]["slides"]["items"]["properties"]["type"];
        assert_eq!(
            kind["enum"],
            json!(["multiple_choice", "true_false", "short_answer"])
        );
        for value in kind["enum"].as_array().unwrap() {
            let parsed: crate::quiz::QuestionKind =
                serde_json::from_value(value.clone()).unwrap();
            assert_eq!(json!(parsed), *value);
        }
    }

    #[test]
    fn prompt_demands_complete_extraction() {
        assert!(DEFAULT_SYSTEM_PROMPT.contains("TOÀN BỘ"));
        assert!(DEFAULT_SYSTEM_PROMPT.contains("multiple_choice"));
        assert!(USER_INSTRUCTION.contains("Không bỏ sót"));
    }
}
