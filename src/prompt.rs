// ABOUTME: Mode-aware instruction assembly for the completion call
// ABOUTME: Generic-mode output passes a redaction sweep before leaving this module
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 MacroFit

//! # Prompt Builder
//!
//! Assembles the system instructions for a completion call. Personalized
//! instructions carry the context summary (today's intake, last meal and
//! workout, weekly aggregates, up to a handful of insights). Generic
//! instructions are a fixed template that forbids the model from implying it
//! has seen any personal data. As a last line of defense, generic output is
//! swept for daily-detail markers and any matching line is dropped; the
//! sweep result is surfaced so the orchestrator can log when it fired.

use crate::mode::AssistantMode;
use crate::models::{HistoryUsageSummary, UserContextSummary};
use regex::Regex;
use std::fmt::Write as _;
use std::sync::OnceLock;

/// Markers that must never appear in generic-mode instructions
fn daily_detail_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?i)(calor[ií]as?\s+de\s+hoy|\d+\s*kcal|última comida|ultima comida|último entrenamiento|ultimo entrenamiento|last meal|last workout|consumiste|has consumido|today you)",
        )
        .expect("daily-detail pattern is a valid regex")
    })
}

/// Built instructions plus redaction outcome
#[derive(Debug, Clone)]
pub struct BuiltPrompt {
    /// System instructions for the completion call
    pub instructions: String,
    /// Whether the generic-mode sweep removed anything
    pub redacted: bool,
}

/// Assembles mode-appropriate system instructions
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptBuilder;

impl PromptBuilder {
    /// Create a prompt builder
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Build the system instructions for a request
    #[must_use]
    pub fn build_instructions(
        &self,
        mode: AssistantMode,
        summary: &UserContextSummary,
        usage: &HistoryUsageSummary,
    ) -> BuiltPrompt {
        match mode {
            AssistantMode::Generic => {
                let (instructions, redacted) = Self::sweep(Self::generic_instructions());
                BuiltPrompt {
                    instructions,
                    redacted,
                }
            }
            AssistantMode::Personalized => BuiltPrompt {
                instructions: Self::personalized_instructions(summary, usage),
                redacted: false,
            },
        }
    }

    fn generic_instructions() -> String {
        "Eres el asistente de MacroFit, una aplicación de nutrición y entrenamiento.\n\
         Responde en el idioma del usuario, con consejos generales de alimentación \
         y ejercicio.\n\
         No tienes acceso a los registros personales del usuario. Nunca afirmes ni \
         insinúes que has visto sus datos, cifras diarias, platos o sesiones. \
         No inventes cifras personales.\n\
         Si el usuario pide análisis de sus propios registros, explica que \
         necesita registrar su actividad durante unos días más para habilitarlo.\n\
         No des diagnósticos médicos ni pautas de medicación; sugiere consultar \
         a un profesional cuando corresponda."
            .to_owned()
    }

    fn personalized_instructions(
        summary: &UserContextSummary,
        usage: &HistoryUsageSummary,
    ) -> String {
        let mut out = String::with_capacity(1024);
        out.push_str(
            "Eres el asistente de MacroFit, una aplicación de nutrición y entrenamiento.\n\
             Responde en el idioma del usuario. Usa únicamente los datos listados \
             abajo; nunca inventes cifras diarias que no aparezcan aquí.\n\
             No des diagnósticos médicos ni pautas de medicación.\n\n\
             Datos del usuario:\n",
        );

        match (summary.total_calories_today, summary.target_calories) {
            (Some(total), Some(target)) => {
                let _ = writeln!(out, "- Calorías de hoy: {total} de un objetivo de {target}");
            }
            (Some(total), None) => {
                let _ = writeln!(out, "- Calorías de hoy: {total}");
            }
            (None, Some(target)) => {
                let _ = writeln!(out, "- Objetivo diario: {target} calorías (sin registros hoy)");
            }
            (None, None) => out.push_str("- Sin registros de comida hoy\n"),
        }

        if let Some(meal) = &summary.last_meal {
            let _ = writeln!(
                out,
                "- Última comida: {} ({} kcal, {})",
                meal.name,
                meal.calories,
                meal.at.format("%Y-%m-%d %H:%M UTC")
            );
        }
        if let Some(workout) = &summary.last_workout {
            let _ = write!(
                out,
                "- Último entrenamiento: {} ({} min, {})",
                workout.name,
                workout.duration_minutes,
                workout.at.format("%Y-%m-%d")
            );
            if let Some(score) = workout.performance_score {
                let _ = write!(out, ", rendimiento {score:.1}");
            }
            out.push('\n');
        }

        let _ = writeln!(
            out,
            "- Semana: {} entrenamientos, {} kcal registradas",
            summary.weekly.workout_count, summary.weekly.total_calories
        );
        let _ = writeln!(
            out,
            "- Constancia: {} días con comidas en 7 días, {} entrenamientos en 14 días",
            usage.days_with_meals_7d, usage.workouts_14d
        );

        if !summary.insights.is_empty() {
            out.push_str("\nObservaciones recientes:\n");
            for insight in &summary.insights {
                let _ = write!(out, "- [{}] {}: {}", insight.insight_type, insight.title,
                    insight.description);
                if let Some(evidence) = &insight.key_evidence {
                    let _ = write!(out, " (evidencia: {evidence})");
                }
                out.push('\n');
            }
        }

        out
    }

    /// Drop any line carrying a daily-detail marker; returns whether the
    /// sweep removed anything
    fn sweep(text: String) -> (String, bool) {
        let pattern = daily_detail_pattern();
        if !pattern.is_match(&text) {
            return (text, false);
        }
        let kept: Vec<&str> = text.lines().filter(|line| !pattern.is_match(line)).collect();
        (kept.join("\n"), true)
    }
}
