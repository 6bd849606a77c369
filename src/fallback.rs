// ABOUTME: Deterministic reply templates and reply-type classification
// ABOUTME: Every non-completion answer the assistant can give originates here
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 MacroFit

//! # Fallback Replies
//!
//! Deterministic reply text for the three paths that never get a completion:
//! the generic-mode template, the out-of-scope rejection, and the fallback
//! used when the completion layer times out or errors. The fallback weaves
//! in whatever context data is available so a degraded answer still feels
//! grounded. Also classifies free-form reply text into the wire reply type.

use crate::models::{ReplyType, UserContextSummary};
use std::fmt::Write as _;

const ACHIEVEMENT_MARKERS: &[&str] = &[
    "felicidades",
    "felicitaciones",
    "lo lograste",
    "lograste",
    "buen trabajo",
    "congratulations",
    "great job",
    "well done",
    "you did it",
];

const RECOMMENDATION_MARKERS: &[&str] = &[
    "te recomiendo",
    "te sugiero",
    "deberías",
    "deberias",
    "podrías probar",
    "podrias probar",
    "i recommend",
    "you should",
    "try adding",
    "consider",
];

/// Fixed reply for generic-mode requests. Deliberately free of the markers
/// [`classify_reply`] keys on, so it always reads as a plain answer.
#[must_use]
pub fn generic_reply() -> String {
    "¡Gracias por escribir! Por ahora puedo darte orientación general sobre \
     alimentación y entrenamiento. Registra tus comidas y entrenamientos \
     durante unos días y podré darte respuestas basadas en tu propia \
     actividad. ¿En qué tema general te ayudo hoy?"
        .to_owned()
}

/// Fixed reply for messages rejected as out of scope
#[must_use]
pub fn out_of_scope_reply() -> String {
    "Ese tema queda fuera de lo que puedo ayudarte aquí. Soy el asistente de \
     nutrición y entrenamiento de MacroFit; pregúntame sobre tus comidas, \
     calorías, rutinas o cómo usar la aplicación."
        .to_owned()
}

/// Deterministic answer used when the completion layer fails. Mentions the
/// freshest context data available so the reply is still useful.
#[must_use]
pub fn completion_fallback(summary: &UserContextSummary) -> String {
    let mut out = String::from(
        "No puedo generar una respuesta completa en este momento, pero aquí va \
         un resumen rápido de tus registros.",
    );

    if let Some(total) = summary.total_calories_today {
        match summary.target_calories {
            Some(target) => {
                let _ = write!(
                    out,
                    " Hoy llevas {total} calorías de tu objetivo de {target}."
                );
            }
            None => {
                let _ = write!(out, " Hoy llevas {total} calorías registradas.");
            }
        }
    }
    if let Some(workout) = &summary.last_workout {
        let _ = write!(
            out,
            " Tu último entrenamiento fue {} ({} min).",
            workout.name, workout.duration_minutes
        );
    }
    if summary.total_calories_today.is_none() && summary.last_workout.is_none() {
        out.push_str(" Todavía no veo registros recientes; vuelve a intentarlo en un momento.");
    } else {
        out.push_str(" Vuelve a intentarlo en un momento para un análisis completo.");
    }
    out
}

/// Classify free-form reply text into the wire reply type. Achievement
/// markers win over recommendation markers when both appear.
#[must_use]
pub fn classify_reply(text: &str) -> ReplyType {
    let lower = text.to_lowercase();
    if ACHIEVEMENT_MARKERS.iter().any(|m| lower.contains(m)) {
        return ReplyType::Achievement;
    }
    if RECOMMENDATION_MARKERS.iter().any(|m| lower.contains(m)) {
        return ReplyType::Recommendation;
    }
    ReplyType::Normal
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{WeeklyAggregate, WorkoutSummary};
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_generic_reply_classifies_as_normal() {
        assert_eq!(classify_reply(&generic_reply()), ReplyType::Normal);
    }

    #[test]
    fn test_classify_reply_markers() {
        assert_eq!(
            classify_reply("Te recomiendo más proteína en el desayuno"),
            ReplyType::Recommendation
        );
        assert_eq!(
            classify_reply("¡Felicidades! Cumpliste tu meta semanal"),
            ReplyType::Achievement
        );
        assert_eq!(
            classify_reply("Llevas 1450 calorías hoy"),
            ReplyType::Normal
        );
    }

    #[test]
    fn test_achievement_wins_over_recommendation() {
        let mixed = "¡Felicidades por tu semana! Te recomiendo mantener el ritmo.";
        assert_eq!(classify_reply(mixed), ReplyType::Achievement);
    }

    #[test]
    fn test_fallback_mentions_available_data() {
        let summary = UserContextSummary {
            total_calories_today: Some(1450),
            target_calories: Some(2200),
            last_meal: None,
            last_workout: Some(WorkoutSummary {
                name: "Piernas".to_owned(),
                duration_minutes: 45,
                at: Utc.with_ymd_and_hms(2026, 8, 27, 18, 0, 0).unwrap(),
                performance_score: None,
            }),
            weekly: WeeklyAggregate::default(),
            insights: Vec::new(),
        };
        let reply = completion_fallback(&summary);
        assert!(reply.contains("1450"));
        assert!(reply.contains("2200"));
        assert!(reply.contains("Piernas"));
    }

    #[test]
    fn test_fallback_without_data_stays_generic() {
        let reply = completion_fallback(&UserContextSummary::default());
        assert!(reply.contains("No puedo generar"));
        assert!(!reply.contains("calorías de tu objetivo"));
    }
}
