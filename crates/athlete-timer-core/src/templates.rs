//! Built-in session templates.
//!
//! Static content for the three timer screens: rest timer presets,
//! meditation scripts and scoliosis PT exercises.

use serde::{Deserialize, Serialize};

use crate::timer::SessionKind;

pub const REST_PRESETS_SECS: [u32; 5] = [30, 60, 90, 120, 180];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTemplate {
    pub id: String,
    pub kind: SessionKind,
    pub label: String,
    /// Duration of one set in seconds.
    pub set_duration_secs: u32,
    pub total_sets: u32,
    #[serde(default)]
    pub guidance: Vec<String>,
    #[serde(default)]
    pub presets: Vec<u32>,
}

impl SessionTemplate {
    fn new(id: &str, kind: SessionKind, label: &str, set_duration_secs: u32, total_sets: u32) -> Self {
        Self {
            id: id.into(),
            kind,
            label: label.into(),
            set_duration_secs,
            total_sets,
            guidance: Vec::new(),
            presets: Vec::new(),
        }
    }

    fn guidance(mut self, lines: &[&str]) -> Self {
        self.guidance = lines.iter().map(|l| l.to_string()).collect();
        self
    }

    fn presets(mut self, presets: &[u32]) -> Self {
        self.presets = presets.to_vec();
        self
    }

    pub fn total_duration_secs(&self) -> u64 {
        u64::from(self.set_duration_secs) * u64::from(self.total_sets)
    }
}

/// All built-in templates, rest timer first.
pub fn builtin_templates() -> Vec<SessionTemplate> {
    vec![
        SessionTemplate::new("rest", SessionKind::Rest, "Rest Between Sets", 90, 1)
            .presets(&REST_PRESETS_SECS),
        SessionTemplate::new("box-breathing", SessionKind::Meditation, "Box Breathing", 240, 1)
            .guidance(&[
                "Sit tall and let your shoulders drop.",
                "Breathe in through your nose for four counts.",
                "Hold the breath gently for four counts.",
                "Breathe out slowly for four counts.",
                "Hold empty for four counts, then repeat.",
                "Let your breathing return to normal.",
            ]),
        SessionTemplate::new("body-scan", SessionKind::Meditation, "Pre-Game Body Scan", 300, 1)
            .guidance(&[
                "Close your eyes and notice your breath.",
                "Bring attention to your feet and ankles.",
                "Move up through your calves, knees and thighs.",
                "Notice your hips, lower back and stomach.",
                "Relax your chest, shoulders and arms.",
                "Soften your jaw, face and forehead.",
                "Take one deep breath and open your eyes.",
            ]),
        SessionTemplate::new("side-plank", SessionKind::PtExercise, "Side Plank Hold (convex side down)", 30, 3)
            .guidance(&[
                "Stack your feet and lift your hips.",
                "Keep a straight line from head to heels.",
                "Breathe into the concave side of your ribs.",
            ]),
        SessionTemplate::new("cat-camel", SessionKind::PtExercise, "Cat-Camel Mobility", 45, 2)
            .guidance(&[
                "Start on hands and knees, spine neutral.",
                "Round your back slowly toward the ceiling.",
                "Let your back sag gently, lifting your chest.",
            ]),
        SessionTemplate::new("schroth-breathing", SessionKind::PtExercise, "Schroth Rotational Breathing", 60, 3)
            .guidance(&[
                "Find your corrected posture in front of a mirror.",
                "Inhale into the flat areas of your back.",
                "Hold the expansion and lengthen your spine.",
                "Exhale slowly while keeping the correction.",
            ]),
    ]
}

pub fn find_template(id: &str) -> Option<SessionTemplate> {
    builtin_templates().into_iter().find(|t| t.id == id)
}
