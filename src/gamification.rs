//! Achievement catalog and unlock evaluation.
//!
//! Pure threshold checks over the learning history; the session layer calls
//! this after every grading and records whatever newly unlocked.

use std::collections::HashSet;

use serde::Serialize;

use crate::domain::HistoryEntry;

#[derive(Clone, Debug, Serialize)]
pub struct Achievement {
  pub id: &'static str,
  pub name: &'static str,
  pub description: &'static str,
  pub icon: &'static str,
}

pub const ACHIEVEMENTS: &[Achievement] = &[
  Achievement {
    id: "first_case",
    name: "Paragraphen-Pionier",
    description: "Du hast deine erste Klausur erfolgreich bewerten lassen!",
    icon: "🚀",
  },
  Achievement {
    id: "bgb_beginner",
    name: "BGB-Entdecker",
    description: "Schließe 5 Zivilrechtsfälle erfolgreich ab.",
    icon: "📘",
  },
  Achievement {
    id: "high_score",
    name: "Gutachten-Guru",
    description: "Erreiche eine Bewertung von 90% oder mehr in einer Klausur.",
    icon: "🏆",
  },
  Achievement {
    id: "streak_3",
    name: "Am Ball geblieben",
    description: "Löse an 3 verschiedenen Tagen eine Klausur.",
    icon: "🔥",
  },
  Achievement {
    id: "exam_ready",
    name: "Examens-Kandidat",
    description: "Schließe eine Klausur der Schwierigkeit 5 ab.",
    icon: "⚖️",
  },
];

/// Evaluate the history against all unlock conditions and return the
/// achievements that are newly earned (not already in `unlocked`).
pub fn check_achievements(historie: &[HistoryEntry], unlocked: &[String]) -> Vec<&'static Achievement> {
  let unlocked_ids: HashSet<&str> = unlocked.iter().map(|s| s.as_str()).collect();

  ACHIEVEMENTS
    .iter()
    .filter(|a| !unlocked_ids.contains(a.id))
    .filter(|a| match a.id {
      "first_case" => !historie.is_empty(),
      "bgb_beginner" => historie.len() >= 5,
      "high_score" => historie.iter().any(|e| e.bewertung >= 90),
      "exam_ready" => historie.iter().any(|e| e.schwierigkeit == 5),
      "streak_3" => {
        let unique_days: HashSet<_> = historie.iter().map(|e| e.datum.date_naive()).collect();
        unique_days.len() >= 3
      }
      _ => false,
    })
    .collect()
}
