//! Database models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A human subject completing the experiment
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Participant {
    pub id: i64,

    // Identity
    pub ip_address: String,
    /// Mechanical Turk worker id
    pub worker_id: String,
    /// Mechanical Turk assignment id
    pub assignment_id: String,
    /// Query arguments the experiment page was requested with
    pub get_args: String,
    /// Free-form audit trail (device posts, crediting responses)
    pub notes: String,
    /// Access key shown to the participant for claiming credit
    pub key: String,
    /// Pilot, test, main...
    pub study: String,

    // Device
    pub ua_header: String,
    pub screen_width: String,
    pub screen_height: String,

    // Validation
    pub captcha_score: Option<f64>,

    // Experiment
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,

    // Demographics
    pub birth_year: Option<i64>,
    pub gender: Option<String>,
    pub native_english: Option<bool>,
    pub dyslexia: Option<bool>,
    pub adhd: Option<bool>,
    pub asd: Option<bool>,
    pub vision: Option<String>,
    pub vision_reason: String,

    // Feedback
    pub post_test_purpose: String,
    pub post_test_other: String,
}

/// Fields needed to create a participant when the experiment page is served
#[derive(Debug, Clone, Default)]
pub struct NewParticipant {
    pub ip_address: String,
    pub key: String,
    pub get_args: String,
    pub study: String,
}

/// Device details posted by the browser once the page is fullscreen
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceInfo {
    pub ua_header: String,
    pub screen_width: String,
    pub screen_height: String,
    pub worker_id: String,
    pub assignment_id: String,
}

/// Demographics questionnaire answers
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Demographics {
    pub birth_year: Option<i64>,
    pub gender: Option<String>,
    pub native_english: bool,
    pub dyslexia: bool,
    pub adhd: bool,
    pub asd: bool,
    pub vision: String,
    pub vision_reason: String,
}

/// Post-test feedback questions stored on the participant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebriefField {
    Purpose,
    Other,
}

impl DebriefField {
    /// Map a questionnaire field name onto a stored column
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "post_test_purpose" => Some(Self::Purpose),
            "post_test_other" => Some(Self::Other),
            _ => None,
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            Self::Purpose => "post_test_purpose",
            Self::Other => "post_test_other",
        }
    }
}

/// Response fields shared by every trial type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TrialResponse {
    /// Unique item id, e.g. `3_fb_1_s_e_im`
    pub item_id: String,
    /// Item template (story) id
    pub item: i64,
    /// `critical` or `attention_check`
    pub item_type: String,
    /// Position in the participant's timeline
    pub trial_index: i64,
    pub correct_answer: String,
    pub response: String,
    pub is_correct: Option<bool>,
    /// Reaction time in ms
    pub reaction_time: f64,
}

/// Item design factors of a critical trial
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CriticalItemData {
    /// True Belief / False Belief
    pub condition: String,
    pub first_mention: String,
    pub recent_mention: String,
    pub knowledge_cue: String,
    pub start: String,
    pub end: String,
}

/// Critical (sentence completion) trial ready for insertion
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewCriticalTrial {
    pub trial: TrialResponse,
    pub item_data: CriticalItemData,
    pub is_start: Option<bool>,
    pub is_end: Option<bool>,
    /// Time spent on the passage screen in ms
    pub passage_reading_time: f64,
}

/// Attention check trial ready for insertion
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewAttentionCheckTrial {
    pub trial: TrialResponse,
    /// Which question was asked (`start_loc`, `end_loc`)
    pub question_id: String,
}

/// Stored critical trial
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CriticalTrial {
    pub id: i64,
    pub participant_id: i64,
    #[sqlx(flatten)]
    pub trial: TrialResponse,
    #[sqlx(flatten)]
    pub item_data: CriticalItemData,
    pub is_start: Option<bool>,
    pub is_end: Option<bool>,
    pub passage_reading_time: f64,
}

/// Stored attention check trial
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AttentionCheckTrial {
    pub id: i64,
    pub participant_id: i64,
    #[sqlx(flatten)]
    pub trial: TrialResponse,
    pub question_id: String,
}

/// Record types that administrators can download
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportEntity {
    Participant,
    Critical,
    AttentionCheck,
}

impl ExportEntity {
    pub const ALL: [ExportEntity; 3] = [
        ExportEntity::Participant,
        ExportEntity::Critical,
        ExportEntity::AttentionCheck,
    ];

    /// Parse the name used in download URLs
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "participant" => Some(Self::Participant),
            "critical" => Some(Self::Critical),
            "attention_check" => Some(Self::AttentionCheck),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Participant => "participant",
            Self::Critical => "critical",
            Self::AttentionCheck => "attention_check",
        }
    }

    pub fn table_name(self) -> &'static str {
        match self {
            Self::Participant => "participants",
            Self::Critical => "critical_trials",
            Self::AttentionCheck => "attention_check_trials",
        }
    }
}
