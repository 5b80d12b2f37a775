//! Call script markup.
//!
//! A [`VoiceScript`] is the sequence of instructions the provider executes
//! once the callee picks up. It renders to provider XML (TwiML).

/// One instruction in a call script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verb {
    /// Silence for the given number of seconds.
    Pause { secs: u32 },
    /// Play the audio file at the given URL.
    Play { url: String },
    /// Send DTMF digits to the callee.
    SendDigits { digits: String },
}

/// Ordered call script.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoiceScript {
    verbs: Vec<Verb>,
}

impl VoiceScript {
    pub fn new() -> Self {
        Self::default()
    }

    /// The fixed prompt sequence: pause, intro, pause, outro, then the
    /// extension digits if any.
    pub fn prompt(intro_url: &str, outro_url: &str, pause_secs: u32, digits: Option<&str>) -> Self {
        let mut script = Self::new()
            .pause(pause_secs)
            .play(intro_url)
            .pause(pause_secs)
            .play(outro_url);
        if let Some(digits) = digits {
            script = script.send_digits(digits);
        }
        script
    }

    pub fn pause(mut self, secs: u32) -> Self {
        self.verbs.push(Verb::Pause { secs });
        self
    }

    pub fn play(mut self, url: impl Into<String>) -> Self {
        self.verbs.push(Verb::Play { url: url.into() });
        self
    }

    pub fn send_digits(mut self, digits: impl Into<String>) -> Self {
        self.verbs.push(Verb::SendDigits {
            digits: digits.into(),
        });
        self
    }

    pub fn verbs(&self) -> &[Verb] {
        &self.verbs
    }

    /// Digits sent by the first send-digits instruction, if any.
    pub fn digits(&self) -> Option<&str> {
        self.verbs.iter().find_map(|verb| match verb {
            Verb::SendDigits { digits } => Some(digits.as_str()),
            _ => None,
        })
    }

    /// Render as TwiML.
    pub fn render(&self) -> String {
        let mut out = String::from("<Response>");
        for verb in &self.verbs {
            let element = match verb {
                Verb::Pause { secs } => format!("<Pause length=\"{}\"/>", secs),
                Verb::Play { url } => format!("<Play>{}</Play>", escape_xml(url)),
                Verb::SendDigits { digits } => {
                    format!("<Play digits=\"{}\"/>", escape_xml(digits))
                }
            };
            out.push_str(&element);
        }
        out.push_str("</Response>");
        out
    }
}

fn escape_xml(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
