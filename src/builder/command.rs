//! Configure command construction.
//!
//! Every build step describes its configure invocation as a
//! [`ConfigureCommand`] and renders it once, right before execution.

/// Flag syntax of the configuration tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigureStyle {
    /// `<script> [options]`
    Plain,

    /// `<script> --prefix <prefix> --libdir <libdir> [options] [--host=..]`
    Autotools,

    /// `cmake -DCMAKE_INSTALL_PREFIX=.. [options] .. <source>`
    CMake { source: String },

    /// `meson --prefix=.. --libdir=.. --default-library=.. [options] <source>`
    Meson {
        default_library: String,
        buildtype: String,
        backend: String,
        source: String,
    },
}

/// Structured configure invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigureCommand {
    /// Configuration script or tool
    pub program: String,

    /// Flag syntax
    pub style: ConfigureStyle,

    /// Install prefix
    pub prefix: String,

    /// Library directory
    pub libdir: String,

    /// `--host` triple, forwarded when set
    pub host: Option<String>,

    /// `--build` triple, forwarded when set
    pub build: Option<String>,

    /// `--target` triple, forwarded when set
    pub target: Option<String>,

    /// Extra options, rendered verbatim in order
    pub options: Vec<String>,
}

impl ConfigureCommand {
    pub fn new(program: impl Into<String>, style: ConfigureStyle) -> Self {
        ConfigureCommand {
            program: program.into(),
            style,
            prefix: String::new(),
            libdir: String::new(),
            host: None,
            build: None,
            target: None,
            options: Vec::new(),
        }
    }

    pub fn paths(mut self, prefix: impl Into<String>, libdir: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self.libdir = libdir.into();
        self
    }

    pub fn options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.extend(options.into_iter().map(Into::into));
        self
    }

    pub fn option(&mut self, option: impl Into<String>) -> &mut Self {
        self.options.push(option.into());
        self
    }

    /// Render the shell command line.
    pub fn render(&self) -> String {
        let mut parts = vec![self.program.clone()];

        match &self.style {
            ConfigureStyle::Plain => {}
            ConfigureStyle::Autotools => {
                parts.push(format!("--prefix {}", self.prefix));
                parts.push(format!("--libdir {}", self.libdir));
            }
            ConfigureStyle::CMake { .. } => {
                parts.push(format!("-DCMAKE_INSTALL_PREFIX={}", self.prefix));
                parts.push(format!("-DCMAKE_LIBRARY_OUTPUT_PATH={}", self.libdir));
            }
            ConfigureStyle::Meson {
                default_library,
                buildtype,
                backend,
                ..
            } => {
                parts.push(format!("--prefix={}", self.prefix));
                parts.push(format!("--libdir={}", self.libdir));
                parts.push(format!("--default-library={}", default_library));
                parts.push(format!("--buildtype={}", buildtype));
                parts.push(format!("--backend={}", backend));
            }
        }

        parts.extend(self.options.iter().filter(|o| !o.is_empty()).cloned());

        if let Some(host) = &self.host {
            parts.push(format!("--host={}", host));
        }
        if let Some(build) = &self.build {
            parts.push(format!("--build={}", build));
        }
        if let Some(target) = &self.target {
            parts.push(format!("--target={}", target));
        }

        match &self.style {
            ConfigureStyle::CMake { source } => {
                parts.push("-DCMAKE_BUILD_TYPE=Release".to_string());
                parts.push(format!("-DCMAKE_FIND_ROOT_PATH={}", self.prefix));
                parts.push(source.clone());
            }
            ConfigureStyle::Meson { source, .. } => parts.push(source.clone()),
            ConfigureStyle::Plain | ConfigureStyle::Autotools => {}
        }

        parts.join(" ")
    }
}
