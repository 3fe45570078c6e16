// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::InvalidRole;

/// Instruction prepended to physician queries.
pub const PHYSICIAN_FRAGMENT: &str = "[User Type: Physician - Provide detailed technical analysis \
with citations, clinical evidence, and research data]";

/// Instruction prepended to patient queries.
pub const PATIENT_FRAGMENT: &str = "[User Type: Patient - Use simple, empathetic language with \
clear explanations and family-friendly overviews, with citations and clinical evidence]";

/// Who is asking.  Selects the response style and scopes the conversation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleTag {
    #[default]
    Patient,
    Physician,
}

impl RoleTag {
    pub const ALL: [RoleTag; 2] = [RoleTag::Patient, RoleTag::Physician];

    /// Capitalised name for display.
    pub fn label(&self) -> &'static str {
        match self {
            RoleTag::Patient => "Patient",
            RoleTag::Physician => "Physician",
        }
    }

    pub fn fragment(&self) -> &'static str {
        match self {
            RoleTag::Patient => PATIENT_FRAGMENT,
            RoleTag::Physician => PHYSICIAN_FRAGMENT,
        }
    }
}

impl fmt::Display for RoleTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoleTag::Patient => write!(f, "patient"),
            RoleTag::Physician => write!(f, "physician"),
        }
    }
}

/// Case-insensitive; anything other than the two roles is rejected rather
/// than defaulted.
impl FromStr for RoleTag {
    type Err = InvalidRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "patient" => Ok(RoleTag::Patient),
            "physician" => Ok(RoleTag::Physician),
            _ => Err(InvalidRole(s.to_string())),
        }
    }
}

/// Prefix `query` with the role's instruction fragment.
///
/// The query text is kept byte for byte after a single separating space.
pub fn contextualize(query: &str, role: RoleTag) -> String {
    format!("{} {}", role.fragment(), query)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patient_query_starts_with_patient_fragment() {
        let q = "What is Dravet syndrome?";
        let out = contextualize(q, RoleTag::Patient);
        assert!(out.starts_with(PATIENT_FRAGMENT));
        assert!(out.ends_with(q));
        assert_eq!(
            out,
            "[User Type: Patient - Use simple, empathetic language with clear explanations and \
             family-friendly overviews, with citations and clinical evidence] What is Dravet syndrome?"
        );
    }

    #[test]
    fn physician_query_starts_with_physician_fragment() {
        let q = "SCN1A variants in Dravet syndrome";
        let out = contextualize(q, RoleTag::Physician);
        assert!(out.starts_with(PHYSICIAN_FRAGMENT));
        assert!(out.contains(q));
        assert!(!out.contains("empathetic"));
    }

    #[test]
    fn query_text_is_preserved_for_every_role() {
        let q = "  multi-line\nquery with [brackets] and <think>tags</think>  ";
        for role in RoleTag::ALL {
            let out = contextualize(q, role);
            assert!(out.contains(q), "{role}: query not preserved");
            assert_eq!(out.len(), role.fragment().len() + 1 + q.len());
        }
    }

    #[test]
    fn contextualize_is_deterministic() {
        assert_eq!(
            contextualize("x", RoleTag::Physician),
            contextualize("x", RoleTag::Physician)
        );
    }

    #[test]
    fn parse_roles_case_insensitively() {
        assert_eq!("Physician".parse::<RoleTag>().unwrap(), RoleTag::Physician);
        assert_eq!(" patient ".parse::<RoleTag>().unwrap(), RoleTag::Patient);
    }

    #[test]
    fn unknown_role_is_an_error_not_a_default() {
        let err = "caregiver".parse::<RoleTag>().unwrap_err();
        assert_eq!(err, InvalidRole("caregiver".into()));
        assert!(err.to_string().contains("expected 'patient' or 'physician'"));
        assert!("".parse::<RoleTag>().is_err());
    }

    #[test]
    fn display_round_trips_through_from_str() {
        for role in RoleTag::ALL {
            assert_eq!(role.to_string().parse::<RoleTag>().unwrap(), role);
        }
    }
}
