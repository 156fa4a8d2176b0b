//! Value types shared by several record payloads

use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

/// Count split by gender. Both sides are non-negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct GenderTally {
    #[validate(range(min = 0, message = "must not be negative"))]
    pub male: i64,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub female: i64,
}

impl GenderTally {
    pub fn total(&self) -> i64 {
        self.male + self.female
    }

    pub fn add(&mut self, gender: Option<Gender>) {
        match gender {
            Some(Gender::Male) => self.male += 1,
            Some(Gender::Female) => self.female += 1,
            None => {}
        }
    }
}
