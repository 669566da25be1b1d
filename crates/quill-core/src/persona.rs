//! Persona configuration and the generation handle it produces.
//!
//! A persona is fixed style guidance applied to every generation call. It is
//! delivered either as a standing system instruction (the backend applies it
//! to each call) or inline, concatenated in front of the user content.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use strum::{Display, EnumString};
use tracing::{info, warn};

use crate::backend::Generator;
use crate::error::{BackendError, ConfigError};

/// Separator placed between persona text and user content in inline mode.
pub const DEFAULT_SEPARATOR: &str = "\n\n사용자: ";

/// How persona text reaches the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum PersonaMode {
    /// Raw pass-through; persona text is ignored.
    None,
    /// Persona sent once per call as the system instruction.
    Standing,
    /// Persona concatenated into the prompt.
    Inline,
}

/// The persona applied to every call made through a [`GenerationHandle`].
#[derive(Clone, PartialEq, Eq)]
pub enum Persona {
    None,
    Standing(String),
    Inline { text: String, separator: String },
}

impl Persona {
    /// Assemble a persona from its configured parts.
    ///
    /// `text` is required for every mode except [`PersonaMode::None`].
    pub fn from_parts(
        mode: PersonaMode,
        text: Option<String>,
        separator: Option<String>,
    ) -> Result<Self, ConfigError> {
        let require_text = |text: Option<String>| {
            text.filter(|t| !t.trim().is_empty())
                .ok_or_else(|| ConfigError::EmptyPersona { mode: mode.to_string() })
        };
        Ok(match mode {
            PersonaMode::None => Persona::None,
            PersonaMode::Standing => Persona::Standing(require_text(text)?),
            PersonaMode::Inline => Persona::Inline {
                text: require_text(text)?,
                separator: separator.unwrap_or_else(|| DEFAULT_SEPARATOR.to_owned()),
            },
        })
    }

    pub fn mode(&self) -> PersonaMode {
        match self {
            Persona::None => PersonaMode::None,
            Persona::Standing(_) => PersonaMode::Standing,
            Persona::Inline { .. } => PersonaMode::Inline,
        }
    }

    /// Build the effective prompt and system instruction for `user_content`.
    pub fn apply<'a>(&'a self, user_content: &'a str) -> (Cow<'a, str>, Option<&'a str>) {
        match self {
            Persona::None => (Cow::Borrowed(user_content), None),
            Persona::Standing(text) => (Cow::Borrowed(user_content), Some(text.as_str())),
            Persona::Inline { text, separator } => {
                let mut prompt =
                    String::with_capacity(text.len() + separator.len() + user_content.len());
                prompt.push_str(text);
                prompt.push_str(separator);
                prompt.push_str(user_content);
                (Cow::Owned(prompt), None)
            }
        }
    }
}

// Persona text can be long; keep logs readable.
impl fmt::Debug for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Persona::None => write!(f, "None"),
            Persona::Standing(t) => write!(f, "Standing({} chars)", t.chars().count()),
            Persona::Inline { text, separator } => write!(
                f,
                "Inline({} chars, separator={separator:?})",
                text.chars().count()
            ),
        }
    }
}

/// Personas shipped with quill, selectable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum PersonaPreset {
    /// The novelist Park Wan-suh: warm, observant, formal sentence endings.
    ParkWanSuh,
}

impl PersonaPreset {
    pub fn instruction(self) -> &'static str {
        match self {
            PersonaPreset::ParkWanSuh => concat!(
                "너는 한국의 소설가 박완서 작가야. ",
                "사용자가 문장을 입력하면, 그 내용을 너만의 따뜻하고 섬세하며 통찰력 있는 문체로 다시 써주거나 답해줘. ",
                "전쟁의 상처를 보듬는 어머니의 마음, 혹은 일상의 소소한 행복을 관찰하는 노작가의 시선을 유지해. ",
                "말투는 '~했답니다', '~이지요', '~군요'와 같은 정갈하고 품위 있는 어미를 사용해줘."
            ),
        }
    }

    /// Labels used by the chat pages.
    pub fn page_text(self) -> PageText {
        match self {
            PersonaPreset::ParkWanSuh => PageText {
                title: "박완서의 서재",
                greeting: "어서 오세요. 어떤 이야기를 나누고 싶으신가요?",
                placeholder: "작가님께 말을 건네보세요...",
                pending: "펜을 고쳐 잡고 생각 중입니다...",
                send: "대화하기",
            },
        }
    }

    pub fn parse(name: &str) -> Result<Self, ConfigError> {
        name.trim()
            .parse()
            .map_err(|_| ConfigError::UnknownPreset(name.to_owned()))
    }
}

/// User-facing strings for the chat pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct PageText {
    pub title: &'static str,
    pub greeting: &'static str,
    pub placeholder: &'static str,
    pub pending: &'static str,
    pub send: &'static str,
}

impl Default for PageText {
    fn default() -> Self {
        PageText {
            title: "quill",
            greeting: "Say something to get started.",
            placeholder: "Type a message...",
            pending: "Thinking...",
            send: "Send",
        }
    }
}

/// Model name plus persona; turns a [`Generator`] into a [`GenerationHandle`].
#[derive(Debug, Clone)]
pub struct PersonaConfig {
    pub model: String,
    pub persona: Persona,
}

impl PersonaConfig {
    pub fn new(model: impl Into<String>, persona: Persona) -> Self {
        Self { model: model.into(), persona }
    }

    /// Bind the configuration to `generator`. No network traffic.
    ///
    /// A standing persona is downgraded to inline concatenation when the
    /// generator cannot take a system instruction.
    pub fn configure(self, generator: Arc<dyn Generator>) -> Result<GenerationHandle, ConfigError> {
        if self.model.trim().is_empty() {
            return Err(ConfigError::EmptyModel);
        }
        let persona = match self.persona {
            Persona::Standing(text) if !generator.supports_standing_instruction() => {
                warn!(
                    backend = generator.name(),
                    "backend has no standing instructions; persona will be sent inline"
                );
                Persona::Inline { text, separator: DEFAULT_SEPARATOR.to_owned() }
            }
            other => other,
        };
        info!(backend = generator.name(), model = %self.model, persona = ?persona, "generation handle ready");
        Ok(GenerationHandle { generator, model: self.model, persona })
    }
}

/// A configured, shareable generation capability.
#[derive(Clone)]
pub struct GenerationHandle {
    generator: Arc<dyn Generator>,
    model: String,
    persona: Persona,
}

impl fmt::Debug for GenerationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationHandle")
            .field("backend", &self.generator.name())
            .field("model", &self.model)
            .field("persona", &self.persona)
            .finish()
    }
}

impl GenerationHandle {
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn persona(&self) -> &Persona {
        &self.persona
    }

    /// Issue one generation call for `user_content` with the persona applied.
    pub async fn generate(&self, user_content: &str) -> Result<String, BackendError> {
        let (prompt, instruction) = self.persona.apply(user_content);
        self.generator.generate(&prompt, instruction).await
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;
    use async_trait::async_trait;

    struct NoInstructions;

    #[async_trait]
    impl Generator for NoInstructions {
        fn name(&self) -> &str {
            "plain"
        }

        fn supports_standing_instruction(&self) -> bool {
            false
        }

        async fn generate(&self, prompt: &str, _: Option<&str>) -> Result<String, BackendError> {
            Ok(prompt.to_owned())
        }
    }

    #[test]
    fn mode_parses_case_insensitively() {
        assert_eq!("Standing".parse::<PersonaMode>().unwrap(), PersonaMode::Standing);
        assert_eq!("inline".parse::<PersonaMode>().unwrap(), PersonaMode::Inline);
        assert!("sideways".parse::<PersonaMode>().is_err());
    }

    #[test]
    fn preset_parses_kebab_name() {
        assert_eq!(PersonaPreset::parse("park-wan-suh").unwrap(), PersonaPreset::ParkWanSuh);
        assert!(matches!(
            PersonaPreset::parse("nobody"),
            Err(ConfigError::UnknownPreset(name)) if name == "nobody"
        ));
    }

    #[test]
    fn text_is_required_unless_mode_none() {
        assert_eq!(Persona::from_parts(PersonaMode::None, None, None).unwrap(), Persona::None);
        assert!(matches!(
            Persona::from_parts(PersonaMode::Standing, Some("  ".into()), None),
            Err(ConfigError::EmptyPersona { .. })
        ));
        assert!(Persona::from_parts(PersonaMode::Inline, None, None).is_err());
    }

    #[test]
    fn inline_uses_default_separator() {
        let p = Persona::from_parts(PersonaMode::Inline, Some("P".into()), None).unwrap();
        let (prompt, instruction) = p.apply("hi");
        assert_eq!(prompt, "P\n\n사용자: hi");
        assert!(instruction.is_none());
    }

    #[test]
    fn standing_keeps_prompt_verbatim() {
        let p = Persona::Standing("P".into());
        let (prompt, instruction) = p.apply("hi");
        assert_eq!(prompt, "hi");
        assert_eq!(instruction, Some("P"));
    }

    #[test]
    fn standing_downgrades_without_backend_support() {
        let handle = PersonaConfig::new("m", Persona::Standing("P".into()))
            .configure(Arc::new(NoInstructions))
            .unwrap();
        assert_eq!(handle.persona().mode(), PersonaMode::Inline);
    }

    #[tokio::test]
    async fn downgraded_handle_sends_concatenated_prompt() {
        let handle = PersonaConfig::new("m", Persona::Standing("P".into()))
            .configure(Arc::new(NoInstructions))
            .unwrap();
        assert_eq!(handle.generate("x").await.unwrap(), format!("P{DEFAULT_SEPARATOR}x"));
    }

    #[test]
    fn blank_model_is_rejected() {
        let err = PersonaConfig::new(" ", Persona::None)
            .configure(Arc::new(NoInstructions))
            .unwrap_err();
        assert!(matches!(err, ConfigError::EmptyModel));
    }

    #[test]
    fn debug_hides_persona_text() {
        let p = Persona::Standing("secret style".into());
        assert_eq!(format!("{p:?}"), "Standing(12 chars)");
    }
}
