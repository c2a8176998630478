//! Command schema types.

/// One argument slot in a command's usage description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageParam {
    /// Argument name, shown as `[name]`.
    pub name: String,
    /// What the argument means.
    pub description: String,
}

impl UsageParam {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// Schema describing a command's interface.
///
/// The first name is canonical; the rest are aliases. Names are matched
/// case-insensitively and must be unique across a registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSchema {
    /// Canonical name followed by aliases.
    pub names: Vec<String>,
    /// Short description for `help`.
    pub description: String,
    /// Ordered argument descriptions.
    pub usage: Vec<UsageParam>,
    /// Custom usage headline, replacing the generated `[a] [b]` form.
    pub usage_top: Option<String>,
    /// What the command responds with, if anything.
    pub returns: Option<String>,
}

impl CommandSchema {
    /// Create a schema with a canonical name.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            names: vec![name.into()],
            description: description.into(),
            usage: Vec::new(),
            usage_top: None,
            returns: None,
        }
    }

    /// Add an alias.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.names.push(alias.into());
        self
    }

    /// Add an argument description.
    pub fn param(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.usage.push(UsageParam::new(name, description));
        self
    }

    /// Replace the generated usage headline.
    pub fn usage_top(mut self, top: impl Into<String>) -> Self {
        self.usage_top = Some(top.into());
        self
    }

    /// Describe the response.
    pub fn returns(mut self, returns: impl Into<String>) -> Self {
        self.returns = Some(returns.into());
        self
    }

    /// The canonical name.
    pub fn name(&self) -> &str {
        self.names.first().map(String::as_str).unwrap_or("")
    }

    /// Aliases after the canonical name.
    pub fn aliases(&self) -> &[String] {
        self.names.get(1..).unwrap_or(&[])
    }

    /// Render the usage block: headline, then one line per argument.
    pub fn render_usage(&self) -> String {
        let top = match &self.usage_top {
            Some(top) => top.clone(),
            None => self
                .usage
                .iter()
                .map(|p| format!("[{}]", p.name))
                .collect::<Vec<_>>()
                .join(" "),
        };
        let lines = self
            .usage
            .iter()
            .map(|p| format!("  {} - {}", p.name, p.description))
            .collect::<Vec<_>>()
            .join("\n");
        format!("{}\n{}", top, lines)
    }

    /// Full help text for `help <command>`.
    pub fn render_help(&self) -> String {
        let mut out = format!("Command: {}", self.name());
        if !self.aliases().is_empty() {
            out.push_str(&format!("\nAliases: {}", self.aliases().join(", ")));
        }
        out.push_str(&format!("\nDescription: {}", self.description));
        out.push_str(&format!("\nUsage: {} {}", self.name(), self.render_usage()));
        out.push_str(&format!(
            "\nReturns: {}",
            self.returns.as_deref().unwrap_or("nothing")
        ));
        out
    }
}
