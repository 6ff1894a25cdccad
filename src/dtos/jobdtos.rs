use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::types::BigDecimal;
use validator::Validate;

use crate::models::jobmodel::{Job, JobEdit, NewJob};

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct CreateJobDto {
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: String,

    #[validate(range(min = 0.0, message = "Price must not be negative"))]
    pub price: f64,

    #[validate(length(min = 1, message = "Address is required"))]
    pub address: String,

    #[validate(length(min = 1, max = 100, message = "Skill must be between 1 and 100 characters"))]
    pub required_skill: Option<String>,
}

impl CreateJobDto {
    pub fn into_new_job(self) -> Result<NewJob, String> {
        let price = to_decimal(self.price)?;
        Ok(NewJob {
            title: self.title,
            price,
            address: self.address,
            required_skill: self.required_skill,
        })
    }
}

#[derive(Debug, Deserialize, Serialize, Validate, Default)]
pub struct UpdateJobDto {
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: Option<String>,

    #[validate(range(min = 0.0, message = "Price must not be negative"))]
    pub price: Option<f64>,

    #[validate(length(min = 1, message = "Address must not be empty"))]
    pub address: Option<String>,

    #[validate(length(min = 1, max = 100, message = "Skill must be between 1 and 100 characters"))]
    pub required_skill: Option<String>,
}

impl UpdateJobDto {
    pub fn into_edit(self) -> Result<JobEdit, String> {
        let price = self.price.map(to_decimal).transpose()?;
        Ok(JobEdit {
            title: self.title,
            price,
            address: self.address,
            required_skill: self.required_skill,
        })
    }
}

/// Parses the shortest decimal text of `value`, so 19.99 stays 19.99 instead of
/// the binary 19.989999...
fn to_decimal(value: f64) -> Result<BigDecimal, String> {
    BigDecimal::from_str(&value.to_string())
        .map(|price| price.round(2).with_scale(2))
        .map_err(|_| "Invalid price".to_string())
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SweepResultDto {
    pub expired_count: usize,
    pub jobs: Vec<Job>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status: String,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(message: &str, data: T) -> Self {
        Self {
            status: "success".to_string(),
            message: message.to_string(),
            data: Some(data),
        }
    }

    pub fn message(message: &str) -> ApiResponse<()> {
        ApiResponse {
            status: "success".to_string(),
            message: message.to_string(),
            data: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_dto_rejects_negative_price_and_blank_title() {
        let dto = CreateJobDto {
            title: String::new(),
            price: -1.0,
            address: "1 Quay St".to_string(),
            required_skill: None,
        };
        let errors = dto.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("title"));
        assert!(fields.contains_key("price"));
    }

    #[test]
    fn price_is_kept_to_two_decimals() {
        let dto = CreateJobDto {
            title: "Paint hallway".to_string(),
            price: 120.5,
            address: "1 Quay St".to_string(),
            required_skill: Some("painting".to_string()),
        };
        let job = dto.into_new_job().unwrap();
        assert_eq!(job.price.to_string(), "120.50");
    }

    #[test]
    fn cents_survive_the_float_conversion() {
        for (input, stored) in [(19.99, "19.99"), (0.29, "0.29"), (1.15, "1.15")] {
            let dto = CreateJobDto {
                title: "Hang shelves".to_string(),
                price: input,
                address: "1 Quay St".to_string(),
                required_skill: None,
            };
            assert_eq!(dto.into_new_job().unwrap().price.to_string(), stored);

            let edit = UpdateJobDto {
                price: Some(input),
                ..UpdateJobDto::default()
            }
            .into_edit()
            .unwrap();
            assert_eq!(edit.price.unwrap().to_string(), stored);
        }
    }

    #[test]
    fn non_finite_price_is_rejected() {
        let edit = UpdateJobDto {
            price: Some(f64::NAN),
            ..UpdateJobDto::default()
        };
        assert!(edit.into_edit().is_err());
    }

    #[test]
    fn update_dto_converts_only_present_fields() {
        let edit = UpdateJobDto {
            price: Some(99.0),
            ..UpdateJobDto::default()
        }
        .into_edit()
        .unwrap();
        assert_eq!(edit.title, None);
        assert_eq!(edit.price.unwrap().to_string(), "99.00");
    }
}
