use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Error type for parsing an ID from its string form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    kind: &'static str,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {} from string", self.kind)
    }
}

impl std::error::Error for ParseIdError {}

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generates a fresh random identifier.
            #[must_use]
            pub fn new_v4() -> Self {
                Self(Uuid::new_v4())
            }

            #[must_use]
            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            #[must_use]
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim())
                    .map(Self)
                    .map_err(|_| ParseIdError {
                        kind: stringify!($name),
                    })
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for a registered user
    UserId
);
uuid_id!(
    /// Unique identifier for a lesson category
    CategoryId
);
uuid_id!(
    /// Unique identifier for a lesson
    LessonId
);
uuid_id!(
    /// Unique identifier for a road sign
    SignId
);
uuid_id!(
    /// Unique identifier for a true/false question
    QuestionId
);
uuid_id!(
    /// Unique identifier for a glossary term
    GlossaryTermId
);
uuid_id!(
    /// Unique identifier for a persisted assessment attempt
    AttemptId
);
uuid_id!(
    /// Unique identifier for a progress record (question or lesson)
    ProgressId
);
uuid_id!(PostId);
uuid_id!(CommentId);
uuid_id!(LikeId);
uuid_id!(ReportId);
uuid_id!(NotificationId);
uuid_id!(AdminLogId);

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_id_display_round_trips_through_from_str() {
        let id = QuestionId::new_v4();
        let parsed: QuestionId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn invalid_id_reports_kind() {
        let err = "not-a-uuid".parse::<LessonId>().unwrap_err();
        assert_eq!(err.to_string(), "failed to parse LessonId from string");
    }

    #[test]
    fn fresh_ids_are_distinct() {
        assert_ne!(UserId::new_v4(), UserId::new_v4());
    }

    #[test]
    fn debug_includes_type_name() {
        let raw = Uuid::nil();
        let id = AttemptId::from_uuid(raw);
        assert_eq!(format!("{id:?}"), format!("AttemptId({raw})"));
        assert_eq!(id.as_uuid(), raw);
    }
}
