//! Persona registry: static behavior fragments composed into each agent's
//! instruction text. Read-only and shared by every session.

use crate::session::AgentSlot;

pub const DEFAULT_PERSONA: &str = "Default";

const BASE_INSTRUCTIONS: &str = "DEBATE RULES:\n\
1. You are in a high-stakes debate competition.\n\
2. RESPOND DIRECTLY to the opponent's last argument.\n\
3. DO NOT be polite. Do not say 'I agree'.\n\
4. FORMATTING: Use **bold** for emphasis.\n\
5. CRITICAL: If you state a specific Fact, Statistic, or Quote, start the line with '> ' (Blockquote) so it highlights on screen.\n";

#[derive(Debug, PartialEq, Eq)]
pub struct Persona {
    pub id: &'static str,
    pub behavior: &'static str,
}

const PERSONAS: &[Persona] = &[
    Persona {
        id: DEFAULT_PERSONA,
        behavior: "ARCHETYPE: Balanced, Logical, Articulate.\n\
BEHAVIOR: You are a standard skilled debater. You use a mix of logic, facts, and rhetoric.",
    },
    Persona {
        id: "The Data Scientist",
        behavior: "ARCHETYPE: Analytical, Empirical, Cold.\n\
BEHAVIOR: You trust only hard numbers. You despise anecdotes.\n\
INSTRUCTION: Use specific statistics (years, %, $). Use a Markdown Table ONLY if comparing 3+ data points. \
Put your key statistic in a blockquote (>).",
    },
    Persona {
        id: "The Philosopher",
        behavior: "ARCHETYPE: Ethical, Abstract, Deep.\n\
BEHAVIOR: You focus on morality, definitions, and human rights.\n\
INSTRUCTION: Use deductive reasoning. Focus on the 'Why' and 'Should'. \
Put your core ethical principle in a blockquote (>).",
    },
    Persona {
        id: "The Debunker",
        behavior: "ARCHETYPE: Aggressive, Skeptical, Sharp.\n\
BEHAVIOR: You are here to expose hypocrisy and logical fallacies.\n\
INSTRUCTION: Quote the opponent and rip them apart. Be ruthless. \
Put the fallacy you exposed in a blockquote (>).",
    },
    Persona {
        id: "The Futurist",
        behavior: "ARCHETYPE: Visionary, Optimistic, Speculative.\n\
BEHAVIOR: You look 50 years ahead. You care about potential.\n\
INSTRUCTION: Paint a picture of the future. Put your prediction in a blockquote (>).",
    },
    Persona {
        id: "The Humanist",
        behavior: "ARCHETYPE: Emotional, Empathetic, Storyteller.\n\
BEHAVIOR: You care about the human cost. You tell stories of real people.\n\
INSTRUCTION: Use emotional language. Put the moral lesson in a blockquote (>).",
    },
];

/// Look up a persona by id. Unknown ids get the Default persona.
pub fn resolve(id: &str) -> &'static Persona {
    PERSONAS
        .iter()
        .find(|p| p.id == id)
        .unwrap_or(&PERSONAS[0])
}

/// Known persona ids, Default first.
pub fn catalogue() -> Vec<&'static str> {
    PERSONAS.iter().map(|p| p.id).collect()
}

fn side_instruction(slot: AgentSlot) -> &'static str {
    match slot {
        AgentSlot::AgentA => "ROLE: PROPOSER (Affirmative). Argue IN FAVOR of the motion.",
        AgentSlot::AgentB => "ROLE: OPPONENT (Negative). Argue AGAINST the motion.",
    }
}

/// Everything an agent turn needs to know about who it is. Built fresh for
/// every turn, never stored on the session.
#[derive(Debug)]
pub struct PersonaContext<'a> {
    pub slot: AgentSlot,
    pub persona: &'static Persona,
    pub topic: &'a str,
    substituted: bool,
}

impl<'a> PersonaContext<'a> {
    pub fn new(slot: AgentSlot, persona_id: &str, topic: &'a str) -> Self {
        let persona = resolve(persona_id);
        let substituted = persona.id != persona_id;
        if substituted {
            tracing::debug!(requested = persona_id, slot = %slot, "unknown persona, using Default");
        }
        Self {
            slot,
            persona,
            topic,
            substituted,
        }
    }

    /// True when the requested id was unknown and Default stands in for it.
    pub fn is_substitute(&self) -> bool {
        self.substituted
    }

    pub fn instruction(&self) -> String {
        format!(
            "IDENTITY: You are {}.\n{}\n\n{}\n\nTOPIC: '{}'\n\n{}",
            self.slot,
            side_instruction(self.slot),
            self.persona.behavior,
            self.topic,
            BASE_INSTRUCTIONS
        )
    }
}

pub fn compose_instruction(slot: AgentSlot, persona_id: &str, topic: &str) -> String {
    PersonaContext::new(slot, persona_id, topic).instruction()
}
