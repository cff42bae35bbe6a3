use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::config::Configuration;
use super::error::OperationError;
use super::executor::{CommandResult, Executor};
use super::resolver::{Dependency, ToolFile};
use super::toolchain::{Toolchain, UNLUAC_JAR_NAME};
use crate::util;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum OperationKind {
    #[strum(to_string = "Decode")]
    SceneDecode,
    #[strum(to_string = "Encode")]
    SceneEncode,
    #[strum(to_string = "Pack .zip")]
    ZipPack,
    #[strum(to_string = "Decrypt .lua")]
    LuaDecrypt,
    #[strum(to_string = "Offsetting Decode")]
    ContainerDecode,
    #[strum(to_string = "Offsetting Encode")]
    ContainerEncode,
}

/// User input for a single operation. Built per click, never kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationRequest {
    SceneDecode {
        input: String,
        output: String,
        textures: String,
    },
    SceneEncode {
        input: String,
        output: String,
        textures: String,
    },
    ZipPack {
        folder: String,
        name: String,
    },
    LuaDecrypt {
        input: String,
    },
    ContainerDecode {
        input: String,
    },
    ContainerEncode {
        input: String,
    },
}

impl OperationRequest {
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::SceneDecode { .. } => OperationKind::SceneDecode,
            Self::SceneEncode { .. } => OperationKind::SceneEncode,
            Self::ZipPack { .. } => OperationKind::ZipPack,
            Self::LuaDecrypt { .. } => OperationKind::LuaDecrypt,
            Self::ContainerDecode { .. } => OperationKind::ContainerDecode,
            Self::ContainerEncode { .. } => OperationKind::ContainerEncode,
        }
    }
}

/// A fully assembled command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub argv: Vec<String>,
    pub use_shell: bool,
    pub output: Option<PathBuf>,
}

impl Invocation {
    fn direct(argv: Vec<String>, output: impl Into<PathBuf>) -> Self {
        Self {
            argv,
            use_shell: false,
            output: Some(output.into()),
        }
    }
}

/// A successful run plus anything worth showing in the output log.
#[derive(Debug, Clone, Default)]
pub struct OperationOutcome {
    pub result: CommandResult,
    pub output: Option<PathBuf>,
    pub notes: Vec<String>,
}

/// Turns requests into external tool runs.
pub struct Operations<'a> {
    toolchain: &'a Toolchain,
    executor: &'a dyn Executor,
    scene_codec: &'a dyn Dependency,
}

impl<'a> Operations<'a> {
    pub fn new(
        toolchain: &'a Toolchain,
        executor: &'a dyn Executor,
        scene_codec: &'a dyn Dependency,
    ) -> Self {
        Self {
            toolchain,
            executor,
            scene_codec,
        }
    }

    pub fn execute(
        &self,
        config: &Configuration,
        request: &OperationRequest,
    ) -> Result<OperationOutcome, OperationError> {
        log::info!("Starting {} operation", request.kind());

        let outcome = match request {
            OperationRequest::LuaDecrypt { input } => self.decrypt_lua(config, input),
            _ => self
                .plan(config, request)
                .and_then(|invocation| self.dispatch(invocation, Vec::new())),
        };

        match &outcome {
            Ok(_) => log::info!("{} operation completed", request.kind()),
            Err(err) => log::error!("{} operation failed: {err}", request.kind()),
        }
        outcome
    }

    /// Checks preconditions and assembles the command line without running anything.
    pub fn plan(
        &self,
        config: &Configuration,
        request: &OperationRequest,
    ) -> Result<Invocation, OperationError> {
        match request {
            OperationRequest::SceneDecode {
                input,
                output,
                textures,
            } => self.scene("scene_dec", input, output, textures),
            OperationRequest::SceneEncode {
                input,
                output,
                textures,
            } => self.scene("scene_enc", input, output, textures),
            OperationRequest::ZipPack { folder, name } => {
                let name = name.trim();
                if folder.is_empty() {
                    return Err(OperationError::EmptyField("Please select an input folder."));
                }
                if name.is_empty() {
                    return Err(OperationError::EmptyField(
                        "Please enter a name for the output file.",
                    ));
                }

                let zip = format!("{name}.zip");
                let mut argv = self.toolchain.scene_codec_prefix();
                argv.extend(["why".to_string(), folder.clone(), zip.clone()]);
                Ok(Invocation::direct(argv, zip))
            }
            OperationRequest::LuaDecrypt { input } => {
                let input = non_empty(input, "Please select a .lua file.")?;
                let jar = self.configured_jar(config)?;
                Ok(self.decompile(jar.path(), input))
            }
            OperationRequest::ContainerDecode { input } => {
                self.container(config, "decode", input, "oct", "json")
            }
            OperationRequest::ContainerEncode { input } => {
                self.container(config, "encode", input, "json", "oct")
            }
        }
    }

    fn scene(
        &self,
        subcommand: &str,
        input: &str,
        output: &str,
        textures: &str,
    ) -> Result<Invocation, OperationError> {
        non_empty(input, "Please select an input file.")?;
        if !self.scene_codec.is_available() {
            return Err(OperationError::MissingSceneCodec);
        }

        let mut argv = self.toolchain.scene_codec_prefix();
        argv.extend([
            subcommand.to_string(),
            input.to_string(),
            output.to_string(),
            "-t".to_string(),
            textures.to_string(),
        ]);
        Ok(Invocation::direct(argv, output))
    }

    fn container(
        &self,
        config: &Configuration,
        action: &str,
        input: &str,
        from: &'static str,
        to: &str,
    ) -> Result<Invocation, OperationError> {
        let input = Path::new(non_empty(input, "Please select an input file.")?);
        if !util::has_extension(input, from) {
            return Err(OperationError::UnexpectedExtension {
                path: input.to_path_buf(),
                expected: from,
            });
        }

        let binary = ToolFile::offsetting(config);
        if !binary.is_available() {
            return Err(OperationError::MissingContainerCodec(binary.path().to_path_buf()));
        }

        let output = input.with_extension(to);
        let argv = vec![
            config.offsetting_path.clone(),
            "oct".to_string(),
            action.to_string(),
            "-t".to_string(),
            input.display().to_string(),
            output.display().to_string(),
        ];
        Ok(Invocation::direct(argv, output))
    }

    fn configured_jar(&self, config: &Configuration) -> Result<ToolFile, OperationError> {
        let jar = ToolFile::unluac(config);
        if jar.is_available() {
            Ok(jar)
        } else {
            Err(OperationError::MissingDecompilerJar(jar.path().to_path_buf()))
        }
    }

    /// `java -jar <jar> <input> > <dir>/<stem>.dec.lua`, run through the shell.
    fn decompile(&self, jar: &Path, input: &str) -> Invocation {
        let input_path = Path::new(input);
        let stem = input_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let output = util::parent_dir(input_path).join(format!("{stem}.dec.lua"));

        Invocation {
            argv: vec![
                self.toolchain.java.clone(),
                "-jar".to_string(),
                jar.display().to_string(),
                input.to_string(),
                ">".to_string(),
                output.display().to_string(),
            ],
            use_shell: true,
            output: Some(output),
        }
    }

    /// Runs the decompiler from a copy of the jar placed beside the input file.
    ///
    /// The copy is removed and `config` is left untouched on every path out.
    fn decrypt_lua(
        &self,
        config: &Configuration,
        input: &str,
    ) -> Result<OperationOutcome, OperationError> {
        let input = non_empty(input, "Please select a .lua file.")?;
        let jar = self.configured_jar(config)?;
        let lua_dir = util::parent_dir(Path::new(input));

        let staged = StagedJar::acquire(jar.path(), &lua_dir)?;
        let scoped = config.with_unluac_path(staged.path());

        let mut notes = Vec::new();
        if staged.owned {
            notes.push(format!("Copied unluac.jar to {}", staged.path().display()));
        }

        let invocation = self.decompile(Path::new(&scoped.unluac_path), input);
        if let Some(output) = &invocation.output {
            notes.push(format!("Output will be saved to {}", output.display()));
        }

        let outcome = self.dispatch(invocation, notes);
        let removed = staged.release();

        outcome.map(|mut outcome| {
            outcome.notes.extend(removed);
            outcome
        })
    }

    fn dispatch(
        &self,
        invocation: Invocation,
        notes: Vec<String>,
    ) -> Result<OperationOutcome, OperationError> {
        let result = self.executor.run(&invocation.argv, invocation.use_shell)?;
        if !result.success() {
            return Err(OperationError::CommandFailure {
                code: result.code,
                stderr: result.stderr,
            });
        }

        Ok(OperationOutcome {
            result,
            output: invocation.output,
            notes,
        })
    }
}

fn non_empty<'s>(value: &'s str, message: &'static str) -> Result<&'s str, OperationError> {
    if value.trim().is_empty() {
        Err(OperationError::EmptyField(message))
    } else {
        Ok(value)
    }
}

/// A copy of the decompiler jar that lives only as long as this guard.
struct StagedJar {
    path: PathBuf,
    owned: bool,
}

impl StagedJar {
    fn acquire(jar: &Path, dir: &Path) -> Result<Self, OperationError> {
        let path = dir.join(UNLUAC_JAR_NAME);

        if same_file(jar, &path) {
            log::debug!("unluac.jar already sits beside the input, not copying");
            return Ok(Self { path, owned: false });
        }
        if path.exists() {
            log::warn!("Refusing to replace existing {}", path.display());
            return Err(OperationError::Staging {
                path,
                source: io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    "a different unluac.jar is already there; move it away and try again",
                ),
            });
        }

        log::info!("Copying {} to {}", jar.display(), path.display());
        // Held before copying so a half-written copy is removed as well.
        let staged = Self { path, owned: true };
        fs::copy(jar, &staged.path).map_err(|source| OperationError::Staging {
            path: staged.path.clone(),
            source,
        })?;
        Ok(staged)
    }

    fn path(&self) -> &Path {
        &self.path
    }

    /// Removes the copy now and returns a log line for it.
    fn release(mut self) -> Option<String> {
        let note = self.remove();
        self.owned = false;
        note
    }

    fn remove(&self) -> Option<String> {
        if !self.owned {
            return None;
        }

        match fs::remove_file(&self.path) {
            Ok(()) => {
                log::info!("Removed temporary unluac.jar from {}", self.path.display());
                Some(format!(
                    "Removed temporary unluac.jar from {}",
                    self.path.display()
                ))
            }
            Err(err) => {
                log::warn!("Could not remove {}: {err}", self.path.display());
                None
            }
        }
    }
}

impl Drop for StagedJar {
    fn drop(&mut self) {
        self.remove();
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
