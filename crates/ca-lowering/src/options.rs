//! Driver configuration.
//!
//! The external front-end owns argv parsing; this struct is the
//! interface it fills in. Flag mapping: `-ll` → `EmitKind::LlvmIr`,
//! `-S` → `Asm`, `-c` → `Object`, `-native` → `Native` (the default),
//! `-jit` → `Jit`; `-O` sets `opt_level`, `-g` sets
//! `emit_debug_info`, `-nomain` sets `no_main`.

/// What artifact the driver produces.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EmitKind {
    /// textual IR
    LlvmIr,
    /// native assembly
    Asm,
    /// native object file
    Object,
    /// linked native executable
    #[default]
    Native,
    /// execute `main` in-process and print its return value
    Jit,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OptLevel {
    #[default]
    O0,
    O1,
}

/// Compilation options handed to the lowering driver.
#[derive(Clone, Debug)]
pub struct CompileOptions {
    pub emit: EmitKind,
    pub opt_level: OptLevel,
    pub emit_debug_info: bool,
    /// suppress the synthesized `main` wrapping top-level statements
    /// (library compilation)
    pub no_main: bool,
    /// directory holding the runtime objects for native linking
    pub runtime_libpath: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            emit: EmitKind::default(),
            opt_level: OptLevel::default(),
            emit_debug_info: false,
            no_main: false,
            runtime_libpath: "cruntime".to_string(),
        }
    }
}

impl CompileOptions {
    /// Defaults with the `CA_RUNTIME_LIBPATH` environment override
    /// applied.
    #[must_use]
    pub fn from_env() -> Self {
        let mut options = CompileOptions::default();
        if let Ok(path) = std::env::var("CA_RUNTIME_LIBPATH")
            && !path.is_empty()
        {
            options.runtime_libpath = path;
        }
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_runtime_path() {
        let o = CompileOptions::default();
        assert_eq!(o.runtime_libpath, "cruntime");
        assert_eq!(o.emit, EmitKind::Native);
        assert!(!o.no_main);
    }
}
