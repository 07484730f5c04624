//! Converts survey rows (one question per row) into a paginated survey trial.

use expkit_core::ConfigError;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

/// Rows shown for long free-text answers.
pub const TEXTAREA_ROWS: u32 = 5;

/// One row of a survey definition
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SurveyRow {
    #[serde(deserialize_with = "lenient_int")]
    pub page_number: i64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub question_text: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub question_type: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub required: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub option_text: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub option_values: String,
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}

fn lenient_int<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    use serde::de::Error;
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .ok_or_else(|| D::Error::custom(format!("invalid page number {n}"))),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| D::Error::custom(format!("invalid page number `{s}`"))),
        other => Err(D::Error::custom(format!("invalid page number {other}"))),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LikertValue {
    pub text: String,
    pub value: Option<String>,
}

/// Widget a question renders as
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Widget {
    Likert {
        likert_scale_values: Vec<LikertValue>,
    },
    MultiSelect {
        options: Vec<String>,
    },
    Text {
        #[serde(skip_serializing_if = "Option::is_none")]
        input_type: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        textbox_rows: Option<u32>,
    },
    Html,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Question {
    pub prompt: String,
    pub required: bool,
    /// Absent for question types the converter does not know.
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub widget: Option<Widget>,
}

/// A survey trial with one list of questions per page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurveyTrial {
    #[serde(rename = "type")]
    pub trial_type: &'static str,
    pub pages: Vec<Vec<Question>>,
}

fn split(list: &str) -> Vec<String> {
    list.split(',').map(str::to_owned).collect()
}

pub fn convert_question(row: &SurveyRow) -> Question {
    let widget = match row.question_type.as_str() {
        "radio" => {
            let values = split(&row.option_values);
            Some(Widget::Likert {
                likert_scale_values: split(&row.option_text)
                    .into_iter()
                    .enumerate()
                    .map(|(i, text)| LikertValue {
                        text,
                        value: values.get(i).cloned(),
                    })
                    .collect(),
            })
        }
        "checkbox" => Some(Widget::MultiSelect {
            options: split(&row.option_text),
        }),
        "textfield" => Some(Widget::Text {
            input_type: None,
            textbox_rows: None,
        }),
        "textarea" => Some(Widget::Text {
            input_type: None,
            textbox_rows: Some(TEXTAREA_ROWS),
        }),
        "numeric" => Some(Widget::Text {
            input_type: Some("number".into()),
            textbox_rows: None,
        }),
        "instruction" => Some(Widget::Html),
        other => {
            warn!(question_type = other, "question type not covered by converter");
            None
        }
    };
    Question {
        prompt: row.question_text.clone(),
        required: row.required != "0",
        widget,
    }
}

/// One survey trial whose page count is the largest page number; each
/// page keeps its questions in input order.
pub fn convert(rows: &[SurveyRow]) -> Vec<SurveyTrial> {
    let num_pages = rows.iter().map(|r| r.page_number).max().unwrap_or(0).max(0) as usize;
    let mut pages: Vec<Vec<Question>> = vec![Vec::new(); num_pages];

    for row in rows {
        if row.page_number < 1 {
            warn!(page_number = row.page_number, prompt = %row.question_text, "row skipped");
            continue;
        }
        pages[row.page_number as usize - 1].push(convert_question(row));
    }

    vec![SurveyTrial {
        trial_type: "survey",
        pages,
    }]
}

pub fn convert_json(json: &str) -> Result<Vec<SurveyTrial>, ConfigError> {
    let rows: Vec<SurveyRow> = serde_json::from_str(json)?;
    Ok(convert(&rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(page: i64, text: &str, kind: &str) -> SurveyRow {
        SurveyRow {
            page_number: page,
            question_text: text.into(),
            question_type: kind.into(),
            required: "1".into(),
            option_text: String::new(),
            option_values: String::new(),
        }
    }

    #[test]
    fn groups_rows_by_page_in_input_order() {
        let rows = vec![
            row(1, "first", "textfield"),
            row(2, "second", "numeric"),
            row(1, "third", "instruction"),
        ];
        let survey = convert(&rows);
        assert_eq!(survey.len(), 1);

        let pages = &survey[0].pages;
        assert_eq!(pages.len(), 2);
        let page_one: Vec<_> = pages[0].iter().map(|q| q.prompt.as_str()).collect();
        assert_eq!(page_one, vec!["first", "third"]);
        assert_eq!(pages[1].len(), 1);
        assert_eq!(pages[1][0].prompt, "second");
    }

    #[test]
    fn radio_zips_text_and_values() {
        let mut radio = row(1, "How often?", "radio");
        radio.option_text = "Never,Sometimes,Often".into();
        radio.option_values = "0,1,2".into();
        radio.required = "0".into();

        let q = convert_question(&radio);
        assert!(!q.required);
        assert_eq!(
            serde_json::to_value(&q).unwrap(),
            json!({
                "prompt": "How often?",
                "required": false,
                "type": "likert",
                "likert_scale_values": [
                    {"text": "Never", "value": "0"},
                    {"text": "Sometimes", "value": "1"},
                    {"text": "Often", "value": "2"},
                ],
            })
        );
    }

    #[test]
    fn widget_kinds_are_distinct() {
        let kinds = ["checkbox", "textfield", "textarea", "numeric", "instruction"];
        let widgets: Vec<_> = kinds
            .iter()
            .map(|k| convert_question(&row(1, "q", k)).widget.unwrap())
            .collect();
        for (i, a) in widgets.iter().enumerate() {
            for b in &widgets[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert_eq!(
            serde_json::to_value(&widgets[3]).unwrap(),
            json!({"type": "text", "input_type": "number"})
        );
        assert_eq!(
            serde_json::to_value(&widgets[0]).unwrap()["type"],
            json!("multi-select")
        );
    }

    #[test]
    fn unknown_type_yields_default_question() {
        let q = convert_question(&row(1, "slider?", "slider"));
        assert_eq!(q.widget, None);
        assert_eq!(
            serde_json::to_value(&q).unwrap(),
            json!({"prompt": "slider?", "required": true})
        );
    }

    #[test]
    fn rows_accept_strings_for_numbers() {
        let survey = convert_json(
            r#"[{"page_number": "2", "question_text": "a", "question_type": "textarea",
                 "required": 0, "option_text": null, "option_values": ""},
                {"page_number": 0, "question_text": "orphan", "question_type": "radio"}]"#,
        )
        .unwrap();
        let pages = &survey[0].pages;
        assert_eq!(pages.len(), 2);
        assert!(pages[0].is_empty());
        assert!(!pages[1][0].required);
    }
}
