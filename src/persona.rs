//! Business persona: prompt shaping and reply post-processing.
//!
//! [`Persona`] turns the [`BusinessProfile`] and the sector knowledge into
//! the system prompt sent ahead of every provider call, rewrites the user
//! turn with the classifier's findings, picks request options from the
//! analysis and patches the provider's reply (emergency number, compliance
//! note) before it reaches the widget.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::classify::SectorConfig;
use crate::types::{MessageAnalysis, RequestOptions, Sector, Sentiment, UrgencyLevel};

/// Who the assistant speaks for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusinessProfile {
    pub name: String,
    /// Emergency line, always surfaced for critical messages.
    pub phone: String,
    pub email: String,
    pub address: String,
    pub coverage: String,
    /// Guaranteed response time for emergencies, e.g. "15 minuti".
    pub response_time: String,
    pub emergency_hours: String,
    pub consulting_hours: String,
    pub services: Vec<String>,
}

impl Default for BusinessProfile {
    fn default() -> Self {
        Self {
            name: "IT-ERA".into(),
            phone: "039 888 2041".into(),
            email: "info@it-era.it".into(),
            address: "Viale Risorgimento 32, Vimercate MB".into(),
            coverage: "Tutta la Lombardia".into(),
            response_time: "15 minuti".into(),
            emergency_hours: "24/7".into(),
            consulting_hours: "08:00-18:00".into(),
            services: vec![
                "🚨 Assistenza IT 24/7 - Supporto tecnico immediato".into(),
                "🛡️ Cybersecurity - Protezione avanzata".into(),
                "☁️ Cloud & Backup - Migrazione e disaster recovery".into(),
                "📞 VoIP - Centralino cloud professionale".into(),
                "🏥 IT Studi Medici - Compliance GDPR sanitario".into(),
                "⚖️ IT Studi Legali - Sicurezza dati sensibili".into(),
            ],
        }
    }
}

/// Request-option presets picked from the urgency level.
const BASE_OPTIONS: (u32, f32) = (250, 0.7);
const HIGH_OPTIONS: (u32, f32) = (200, 0.6);
const CRITICAL_OPTIONS: (u32, f32) = (150, 0.5);
const EMPATHETIC_TEMPERATURE: f32 = 0.8;

#[derive(Debug, Clone)]
pub struct Persona {
    profile: BusinessProfile,
    sectors: SectorConfig,
}

impl Persona {
    pub fn new(profile: BusinessProfile, sectors: SectorConfig) -> Self {
        Self { profile, sectors }
    }

    pub fn profile(&self) -> &BusinessProfile {
        &self.profile
    }

    /// Base personality plus the block for `sector`.
    pub fn system_prompt(&self, sector: Sector) -> String {
        let p = &self.profile;
        let mut prompt = format!(
            "Sei l'assistente virtuale di {name}, servizi IT per aziende.\n\n\
             INFORMAZIONI AZIENDA:\n\
             - Nome: {name}\n\
             - Telefono: {phone} (da fornire SEMPRE per le emergenze)\n\
             - Email: {email}\n\
             - Indirizzo: {address}\n\
             - Copertura: {coverage}\n\
             - Tempo di risposta: {response_time} garantiti per le emergenze\n\
             - Orari: {emergency_hours} per emergenze, {consulting_hours} per consulenze\n\n\
             SERVIZI:\n",
            name = p.name,
            phone = p.phone,
            email = p.email,
            address = p.address,
            coverage = p.coverage,
            response_time = p.response_time,
            emergency_hours = p.emergency_hours,
            consulting_hours = p.consulting_hours,
        );
        for (i, service) in p.services.iter().enumerate() {
            let _ = writeln!(prompt, "{}. {service}", i + 1);
        }
        let _ = write!(
            prompt,
            "\nREGOLE:\n\
             1. Per le emergenze fornisci subito il numero {phone}.\n\
             2. Adatta linguaggio e soluzioni al settore del cliente.\n\
             3. Per i settori sensibili cita la compliance GDPR.\n\
             4. Ricorda la garanzia di {response_time} per le emergenze.\n\
             5. Risposte brevi ma complete, massimo 4-5 frasi.\n",
            phone = p.phone,
            response_time = p.response_time,
        );

        if let Some(knowledge) = self.sectors.knowledge_for(sector) {
            let _ = write!(
                prompt,
                "\nSETTORE SPECIFICO: {}\n\
                 COMPLIANCE RICHIESTA: {}\n\
                 SERVIZI SPECIALIZZATI: {}\n\
                 PAROLE CHIAVE URGENZA: {}",
                sector.as_str().to_uppercase(),
                knowledge.compliance.join(", "),
                knowledge.services.join(", "),
                knowledge.urgency_keywords.join(", "),
            );
        }
        prompt
    }

    /// Tone and content directives for the provider, one per line.
    pub fn contextual_instructions(&self, analysis: &MessageAnalysis) -> Vec<String> {
        let p = &self.profile;
        let mut instructions = Vec::new();

        if analysis.urgency.level == UrgencyLevel::Critical {
            instructions.push(format!(
                "PRIORITÀ MASSIMA: fornisci subito il numero di emergenza {}",
                p.phone
            ));
            instructions.push("Usa un tono urgente ma professionale".into());
            instructions.push(format!("Menziona la garanzia di {}", p.response_time));
        }

        match analysis.sector.sector {
            Sector::Medical => {
                instructions.push("Menziona la compliance GDPR sanitario".into());
                instructions.push("Sottolinea la sicurezza dei dati dei pazienti".into());
            }
            Sector::Legal => {
                instructions.push("Menziona la compliance GDPR legale".into());
                instructions.push("Sottolinea la riservatezza dei documenti".into());
            }
            Sector::General => {}
        }

        if analysis.sentiment.sentiment == Sentiment::Negative {
            instructions.push("Usa un tono empatico e rassicurante".into());
            instructions.push("Proponi soluzioni immediate".into());
        }
        instructions
    }

    /// The user turn as sent to the provider: original text, then the
    /// analysis summary and the contextual instructions.
    pub fn enhanced_user_message(&self, text: &str, analysis: &MessageAnalysis) -> String {
        let mut message = format!(
            "{text}\n\n\
             ANALISI:\n\
             - Urgenza: {} (score: {:.1})\n\
             - Settore: {} (confidence: {})\n\
             - Servizio: {} (confidence: {})\n\
             - Sentiment: {} (confidence: {})\n\
             - Intent: {}\n\
             - Emergenza: {}\n\
             - Lunghezza messaggio: {}\n",
            analysis.urgency.level.as_str(),
            analysis.urgency.adjusted_score,
            analysis.sector.sector.as_str(),
            analysis.sector.confidence,
            analysis.service.service.as_str(),
            analysis.service.confidence,
            analysis.sentiment.sentiment.as_str(),
            analysis.sentiment.confidence,
            analysis.intent.as_str(),
            if analysis.has_emergency_keywords { "SÌ" } else { "NO" },
            analysis.message_length,
        );
        let instructions = self.contextual_instructions(analysis);
        if !instructions.is_empty() {
            message.push_str("\nISTRUZIONI:\n");
            for line in instructions {
                let _ = writeln!(message, "- {line}");
            }
        }
        message
    }

    /// Options implied by the analysis. Caller-supplied options are laid
    /// over these with [`RequestOptions::or`].
    pub fn options_for(&self, analysis: &MessageAnalysis) -> RequestOptions {
        let (max_tokens, mut temperature) = match analysis.urgency.level {
            UrgencyLevel::Critical => CRITICAL_OPTIONS,
            UrgencyLevel::High => HIGH_OPTIONS,
            _ => BASE_OPTIONS,
        };
        if analysis.sentiment.sentiment == Sentiment::Negative {
            temperature = EMPATHETIC_TEMPERATURE;
        }
        RequestOptions::new()
            .max_tokens(max_tokens)
            .temperature(temperature)
            .sector(analysis.sector.sector)
            .urgency_hint(analysis.urgency.level)
    }

    /// Make sure critical replies carry the emergency number and sensitive
    /// sectors carry a compliance note.
    pub fn enhance_response(&self, reply: &str, analysis: &MessageAnalysis) -> String {
        let p = &self.profile;
        let mut enhanced = String::with_capacity(reply.len() + 96);

        if analysis.urgency.level == UrgencyLevel::Critical && !reply.contains(&p.phone) {
            let _ = write!(enhanced, "🚨 **EMERGENZA**: Chiama subito {}!\n\n", p.phone);
        }
        enhanced.push_str(reply);

        if !reply.contains("GDPR") {
            match analysis.sector.sector {
                Sector::Medical => {
                    let _ = write!(
                        enhanced,
                        "\n\n🏥 *{} garantisce compliance GDPR sanitario.*",
                        p.name
                    );
                }
                Sector::Legal => {
                    let _ = write!(
                        enhanced,
                        "\n\n⚖️ *{} assicura compliance GDPR legale.*",
                        p.name
                    );
                }
                Sector::General => {}
            }
        }
        enhanced
    }

    /// Greeting for a chat opened at local `hour`.
    pub fn welcome_message(&self, hour: u32) -> String {
        let greeting = match hour {
            0..=11 => "Buongiorno",
            12..=17 => "Buon pomeriggio",
            _ => "Buonasera",
        };
        let p = &self.profile;
        format!(
            "{greeting}! 👋 Sono l'assistente virtuale di {name}.\n\n\
             🚨 **EMERGENZA IT?** Chiama subito: **{phone}**\n\
             ⚡ Risposta garantita in {response_time}!\n\n\
             Come posso aiutarti oggi?",
            name = p.name,
            phone = p.phone,
            response_time = p.response_time,
        )
    }
}

impl Default for Persona {
    fn default() -> Self {
        Self::new(BusinessProfile::default(), SectorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Classifier;
    use chrono::{NaiveDate, NaiveDateTime};

    fn wednesday(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 12)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn analyze(text: &str, hour: u32) -> MessageAnalysis {
        Classifier::default().analyze(text, wednesday(hour))
    }

    #[test]
    fn system_prompt_carries_sector_block() {
        let prompt = Persona::default().system_prompt(Sector::Medical);
        assert!(prompt.contains("039 888 2041"));
        assert!(prompt.contains("SETTORE SPECIFICO: MEDICAL"));
        assert!(prompt.contains("GDPR sanitario"));
    }

    #[test]
    fn critical_reply_gets_phone_prefix() {
        let analysis = analyze("emergenza, server bloccato", 22);
        assert_eq!(analysis.urgency.level, UrgencyLevel::Critical);
        let reply = Persona::default().enhance_response("Stiamo verificando.", &analysis);
        assert!(reply.starts_with("🚨 **EMERGENZA**: Chiama subito 039 888 2041!"));
        assert!(reply.ends_with("Stiamo verificando."));
    }

    #[test]
    fn phone_already_present_is_not_repeated() {
        let analysis = analyze("emergenza, server bloccato", 22);
        let reply = Persona::default().enhance_response("Chiama il 039 888 2041", &analysis);
        assert_eq!(reply, "Chiama il 039 888 2041");
    }

    #[test]
    fn medical_reply_gets_compliance_note() {
        let analysis = analyze("il paziente non riesce ad accedere", 10);
        assert_eq!(analysis.sector.sector, Sector::Medical);
        let reply = Persona::default().enhance_response("Ok.", &analysis);
        assert!(reply.ends_with("🏥 *IT-ERA garantisce compliance GDPR sanitario.*"));
    }

    #[test]
    fn options_follow_urgency_and_sentiment() {
        let persona = Persona::default();

        let calm = persona.options_for(&analyze("vorrei un preventivo", 10));
        assert_eq!(calm.max_tokens, Some(250));
        assert_eq!(calm.temperature, Some(0.7));

        let critical = persona.options_for(&analyze("emergenza, server bloccato", 22));
        assert_eq!(critical.max_tokens, Some(150));
        assert_eq!(critical.temperature, Some(0.5));

        let upset = persona.options_for(&analyze("sono frustrato", 10));
        assert_eq!(upset.temperature, Some(0.8));
    }

    #[test]
    fn welcome_greeting_by_hour() {
        let persona = Persona::default();
        assert!(persona.welcome_message(9).starts_with("Buongiorno"));
        assert!(persona.welcome_message(12).starts_with("Buon pomeriggio"));
        assert!(persona.welcome_message(18).starts_with("Buonasera"));
    }

    #[test]
    fn enhanced_user_message_lists_instructions() {
        let analysis = analyze("emergenza, server bloccato", 22);
        let message = Persona::default().enhanced_user_message("emergenza, server bloccato", &analysis);
        assert!(message.starts_with("emergenza, server bloccato\n\nANALISI:"));
        assert!(message.contains("- Urgenza: critical"));
        assert!(message.contains("ISTRUZIONI:"));
    }
}
