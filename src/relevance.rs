// ABOUTME: Two-tier keyword/phrase filter rejecting clearly off-domain messages
// ABOUTME: Runs before any expensive work; only high-confidence rejection short-circuits
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 MacroFit

//! # Relevance Classifier
//!
//! Classifies a raw user message as in- or out-of-domain before any costly
//! work happens. The checks run in strict precedence order; each produces a
//! confidence the orchestrator uses for its short-circuit rule: a request is
//! rejected without a completion call only when the verdict is irrelevant
//! with confidence above 0.85. Everything ambiguous flows through, where
//! mode gating remains the conservative safeguard.
//!
//! Keyword tables carry Spanish and English variants; the user base is
//! Spanish-first.

use serde::Serialize;

/// Exact phrases that are always rejected (medical/doping advice requests)
const PROHIBITED_PHRASES: &[&str] = &[
    "diagnóstico médico",
    "diagnostico medico",
    "receta médica",
    "receta medica",
    "dosis de medicamento",
    "esteroides anabólicos",
    "esteroides anabolicos",
    "medical diagnosis",
    "anabolic steroids",
    "prescribe me",
];

/// Single keywords that mark a message as out of domain
const OUT_OF_DOMAIN_KEYWORDS: &[&str] = &[
    "ropa",
    "marca",
    "zapatos",
    "película",
    "pelicula",
    "coche",
    "viaje",
    "hotel",
    "vuelo",
    "cripto",
    "criptomonedas",
    "bolsa",
    "política",
    "politica",
    "elecciones",
    "lotería",
    "loteria",
    "clothes",
    "brand",
    "shoes",
    "movie",
    "movies",
    "stocks",
    "crypto",
    "politics",
    "lottery",
];

/// Greeting tokens accepted with high confidence when the message is short
const GREETING_TOKENS: &[&str] = &[
    "hola", "hello", "hey", "hi", "buenas", "buenos", "saludos",
];

/// Keywords inside the assistant's declared domain
const DOMAIN_KEYWORDS: &[&str] = &[
    "caloría",
    "calorías",
    "caloria",
    "calorias",
    "kcal",
    "comida",
    "comidas",
    "dieta",
    "nutrición",
    "nutricion",
    "proteína",
    "proteínas",
    "proteina",
    "proteinas",
    "carbohidratos",
    "grasa",
    "grasas",
    "desayuno",
    "almuerzo",
    "cena",
    "entrenamiento",
    "entrenamientos",
    "entrenar",
    "ejercicio",
    "ejercicios",
    "rutina",
    "gimnasio",
    "pesas",
    "músculo",
    "músculos",
    "musculo",
    "musculos",
    "peso",
    "adelgazar",
    "macros",
    "ayuno",
    "hidratación",
    "hidratacion",
    "cardio",
    "correr",
    "calorie",
    "calories",
    "meal",
    "meals",
    "diet",
    "protein",
    "carbs",
    "workout",
    "workouts",
    "exercise",
    "training",
    "muscle",
    "weight",
    "fitness",
    "gym",
];

/// App-navigation phrases accepted with medium confidence
const NAVIGATION_PHRASES: &[&str] = &[
    "cómo registro",
    "como registro",
    "cómo agrego",
    "como agrego",
    "cómo cambio",
    "como cambio",
    "dónde veo",
    "donde veo",
    "en la aplicación",
    "en la aplicacion",
    "la app",
    "how do i log",
    "how do i add",
    "where can i see",
];

/// Messages shorter than this (in chars) take the short-text branches
const SHORT_TEXT_MAX_CHARS: usize = 24;
/// Messages at least this long with zero domain keywords are flagged
const LONG_TEXT_MIN_CHARS: usize = 120;

/// Why the classifier decided the way it did; logged for later tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RelevanceReason {
    ProhibitedPhrase,
    OutOfDomainKeyword,
    Greeting,
    ShortAmbiguous,
    DomainKeywords,
    AppNavigation,
    LongUnrecognized,
    Unclassified,
}

impl RelevanceReason {
    /// Stable string form for structured logs
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ProhibitedPhrase => "prohibited_phrase",
            Self::OutOfDomainKeyword => "out_of_domain_keyword",
            Self::Greeting => "greeting",
            Self::ShortAmbiguous => "short_ambiguous",
            Self::DomainKeywords => "domain_keywords",
            Self::AppNavigation => "app_navigation",
            Self::LongUnrecognized => "long_unrecognized",
            Self::Unclassified => "unclassified",
        }
    }
}

/// Classification verdict
#[derive(Debug, Clone, Copy)]
pub struct RelevanceVerdict {
    /// Whether the message is considered in-domain
    pub is_relevant: bool,
    /// Confidence in the verdict, 0.0 - 1.0
    pub confidence: f32,
    /// Which rule produced the verdict
    pub reason: RelevanceReason,
}

impl RelevanceVerdict {
    /// Whether the orchestrator must short-circuit this request: rejected
    /// with high confidence, no completion call, no rate-limit charge
    #[must_use]
    pub fn short_circuits(&self) -> bool {
        !self.is_relevant && self.confidence > 0.85
    }
}

/// Two-tier keyword/phrase relevance filter
#[derive(Debug, Clone, Copy, Default)]
pub struct RelevanceClassifier;

impl RelevanceClassifier {
    /// Create a classifier with the built-in keyword tables
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Classify a raw message. Checks run in strict precedence order.
    #[must_use]
    pub fn classify(&self, text: &str) -> RelevanceVerdict {
        let lower = text.to_lowercase();
        let tokens: Vec<&str> = lower
            .split(|c: char| !c.is_alphabetic())
            .filter(|t| !t.is_empty())
            .collect();
        let char_len = text.chars().count();

        // 1. Exact prohibited phrases
        if PROHIBITED_PHRASES.iter().any(|p| lower.contains(p)) {
            return RelevanceVerdict {
                is_relevant: false,
                confidence: 0.99,
                reason: RelevanceReason::ProhibitedPhrase,
            };
        }

        // 2. Out-of-domain keywords (whole-token match)
        if tokens
            .iter()
            .any(|t| OUT_OF_DOMAIN_KEYWORDS.contains(t))
        {
            return RelevanceVerdict {
                is_relevant: false,
                confidence: 0.98,
                reason: RelevanceReason::OutOfDomainKeyword,
            };
        }

        // 3. Short greetings
        if char_len < SHORT_TEXT_MAX_CHARS && tokens.iter().any(|t| GREETING_TOKENS.contains(t)) {
            return RelevanceVerdict {
                is_relevant: true,
                confidence: 0.9,
                reason: RelevanceReason::Greeting,
            };
        }

        // 4. Other short text: ambiguous, admitted with low confidence so
        // downstream gating decides conservatively
        if char_len < SHORT_TEXT_MAX_CHARS {
            return RelevanceVerdict {
                is_relevant: true,
                confidence: 0.4,
                reason: RelevanceReason::ShortAmbiguous,
            };
        }

        // 5. Domain keyword density
        let domain_hits = tokens.iter().filter(|t| DOMAIN_KEYWORDS.contains(t)).count();
        if domain_hits >= 2 {
            return RelevanceVerdict {
                is_relevant: true,
                confidence: 0.95,
                reason: RelevanceReason::DomainKeywords,
            };
        }
        if domain_hits == 1 {
            return RelevanceVerdict {
                is_relevant: true,
                confidence: 0.85,
                reason: RelevanceReason::DomainKeywords,
            };
        }

        // 6. App-navigation phrases
        if NAVIGATION_PHRASES.iter().any(|p| lower.contains(p)) {
            return RelevanceVerdict {
                is_relevant: true,
                confidence: 0.7,
                reason: RelevanceReason::AppNavigation,
            };
        }

        // 7. Long and keyword-free: admitted but flagged for tuning
        if char_len >= LONG_TEXT_MIN_CHARS {
            return RelevanceVerdict {
                is_relevant: true,
                confidence: 0.2,
                reason: RelevanceReason::LongUnrecognized,
            };
        }

        RelevanceVerdict {
            is_relevant: true,
            confidence: 0.5,
            reason: RelevanceReason::Unclassified,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(text: &str) -> RelevanceVerdict {
        RelevanceClassifier::new().classify(text)
    }

    #[test]
    fn test_out_of_domain_shopping_question_rejected() {
        let verdict = classify("¿Qué marca de ropa me recomiendas?");
        assert!(!verdict.is_relevant);
        assert!(verdict.confidence >= 0.95);
        assert_eq!(verdict.reason, RelevanceReason::OutOfDomainKeyword);
        assert!(verdict.short_circuits());
    }

    #[test]
    fn test_prohibited_phrase_takes_precedence() {
        let verdict = classify("Necesito un diagnóstico médico para mi dieta");
        assert!(!verdict.is_relevant);
        assert!((verdict.confidence - 0.99).abs() < f32::EPSILON);
        assert_eq!(verdict.reason, RelevanceReason::ProhibitedPhrase);
    }

    #[test]
    fn test_short_greeting_accepted() {
        let verdict = classify("Hola");
        assert!(verdict.is_relevant);
        assert!(verdict.confidence >= 0.85);
        assert_eq!(verdict.reason, RelevanceReason::Greeting);
    }

    #[test]
    fn test_short_ambiguous_admitted_with_low_confidence() {
        let verdict = classify("¿y mañana?");
        assert!(verdict.is_relevant);
        assert!(verdict.confidence < 0.5);
        assert_eq!(verdict.reason, RelevanceReason::ShortAmbiguous);
        assert!(!verdict.short_circuits());
    }

    #[test]
    fn test_domain_keyword_density() {
        let two = classify("¿Cuántas calorías y proteína debería comer al día?");
        assert_eq!(two.reason, RelevanceReason::DomainKeywords);
        assert!((two.confidence - 0.95).abs() < f32::EPSILON);

        let one = classify("Quiero mejorar mi rutina, ¿por dónde empiezo?");
        assert_eq!(one.reason, RelevanceReason::DomainKeywords);
        assert!((one.confidence - 0.85).abs() < f32::EPSILON);
    }

    #[test]
    fn test_navigation_phrase_medium_confidence() {
        let verdict = classify("No encuentro dónde veo mi resumen semanal de avances");
        assert!(verdict.is_relevant);
        assert!((verdict.confidence - 0.7).abs() < f32::EPSILON);
        assert_eq!(verdict.reason, RelevanceReason::AppNavigation);
    }

    #[test]
    fn test_long_keyword_free_text_flagged_not_rejected() {
        let long = "Estuve pensando mucho en todo lo que ha pasado durante este mes \
                    y la verdad es que no estoy seguro de nada en particular, \
                    pero igual quería contártelo con detalle.";
        let verdict = classify(long);
        assert!(verdict.is_relevant);
        assert!((verdict.confidence - 0.2).abs() < f32::EPSILON);
        assert_eq!(verdict.reason, RelevanceReason::LongUnrecognized);
        assert!(!verdict.short_circuits());
    }
}
