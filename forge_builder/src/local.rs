/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use forge_cas::ContentAddressableStorage;
use forge_core::digest::CasDigest;
use forge_core::digest::DirectoryDigest;
use forge_core::digest::TreeDigest;
use forge_core::error::Code;
use forge_core::error::Error;
use forge_core::error::Result;
use forge_core::fs::paths::FileName;
use forge_core::fs::paths::ForwardRelativePath;
use forge_core::instance::InstanceName;
use forge_proto::build::bazel::remote::execution::v2::Action;
use forge_proto::build::bazel::remote::execution::v2::ActionResult;
use forge_proto::build::bazel::remote::execution::v2::Command;
use forge_proto::build::bazel::remote::execution::v2::Digest;
use forge_proto::build::bazel::remote::execution::v2::Directory;
use forge_proto::build::bazel::remote::execution::v2::DirectoryNode;
use forge_proto::build::bazel::remote::execution::v2::ExecuteRequest;
use forge_proto::build::bazel::remote::execution::v2::ExecuteResponse;
use forge_proto::build::bazel::remote::execution::v2::FileNode;
use forge_proto::build::bazel::remote::execution::v2::OutputDirectory;
use forge_proto::build::bazel::remote::execution::v2::OutputFile;
use forge_proto::build::bazel::remote::execution::v2::SymlinkNode;
use forge_proto::build::bazel::remote::execution::v2::Tree;
use futures::future::BoxFuture;
use futures::future::FutureExt;
use indexmap::IndexMap;

use crate::run::gather_status;
use crate::run::GatherStatus;
use crate::BuildExecutor;
use crate::InputFileExposer;

/// The filesystem layout one executor owns exclusively for the duration of
/// each execution. The defaults are intentionally absolute and fixed so the
/// executor can be confined to a known prefix; replicas sharing a machine
/// must use disjoint roots.
#[derive(Clone, Debug)]
pub struct BuildDirectories {
    /// Where the input root is materialized and the command runs. Wiped
    /// before every execution.
    pub build_root: PathBuf,
    /// Handed to the command as `$HOME`. Wiped before every execution.
    pub temp_root: PathBuf,
    /// Where the command's standard output is captured.
    pub stdout_path: PathBuf,
    /// Where the command's standard error is captured.
    pub stderr_path: PathBuf,
}

impl Default for BuildDirectories {
    fn default() -> Self {
        Self {
            build_root: PathBuf::from("/build"),
            temp_root: PathBuf::from("/tmp"),
            stdout_path: PathBuf::from("/stdout"),
            stderr_path: PathBuf::from("/stderr"),
        }
    }
}

/// The unprivileged identity commands are dropped to.
#[derive(Copy, Clone, Debug)]
pub struct Credentials {
    pub uid: u32,
    pub gid: u32,
}

impl Credentials {
    pub fn unprivileged() -> Self {
        Self { uid: 1, gid: 1 }
    }
}

/// A 'BuildExecutor' that runs build actions on the local system.
///
/// One executor instance assumes exclusive ownership of its
/// 'BuildDirectories'; running two executions concurrently on one instance
/// is undefined, the scheduler serializes them.
///
/// Passing `credentials: None` runs commands as the executor's own user.
/// That is a weaker guarantee than the default credential drop and is meant
/// for unprivileged hosts and tests.
pub struct LocalBuildExecutor {
    storage: Arc<dyn ContentAddressableStorage>,
    input_file_exposer: Arc<dyn InputFileExposer>,
    directories: BuildDirectories,
    credentials: Option<Credentials>,
}

fn required_digest<Kind>(digest: &Option<Digest>, field: &str) -> Result<CasDigest<Kind>> {
    match digest {
        Some(digest) => Ok(CasDigest::from_proto(digest)?),
        None => Err(Error::invalid_argument(format!("missing {}", field))),
    }
}

async fn remove_all(path: &Path) -> Result<()> {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Input directories are created world-writable: the command runs under a
/// different identity than the executor and still needs to write its
/// outputs in there.
async fn create_build_dir(path: &Path) -> Result<()> {
    tokio::fs::create_dir(path).await?;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o777)).await?;
    Ok(())
}

impl LocalBuildExecutor {
    pub fn new(
        storage: Arc<dyn ContentAddressableStorage>,
        input_file_exposer: Arc<dyn InputFileExposer>,
        directories: BuildDirectories,
        credentials: Option<Credentials>,
    ) -> Self {
        Self {
            storage,
            input_file_exposer,
            directories,
            credentials,
        }
    }

    /// Recursively materializes the directory named by `digest` at `path`.
    /// Every name is validated before it is joined, so a hostile directory
    /// message cannot reach outside the build root.
    fn create_input_directory<'a>(
        &'a self,
        instance: &'a InstanceName,
        digest: &'a DirectoryDigest,
        path: &'a Path,
    ) -> BoxFuture<'a, Result<()>> {
        async move {
            create_build_dir(path).await?;
            let directory = self.storage.get_directory(instance, digest).await?;

            for file in &directory.files {
                let name = FileName::new(&file.name)?;
                let file_digest = required_digest(&file.digest, "input file digest")?;
                self.input_file_exposer
                    .expose(
                        instance,
                        &file_digest,
                        &path.join(name.as_str()),
                        file.is_executable,
                    )
                    .await?;
            }
            for child in &directory.directories {
                let name = FileName::new(&child.name)?;
                let child_digest = required_digest(&child.digest, "input directory digest")?;
                self.create_input_directory(instance, &child_digest, &path.join(name.as_str()))
                    .await?;
            }
            // TODO(forge): create symlinks in the input root in a way that
            // cannot escape it; until then they are rejected outright.
            if !directory.symlinks.is_empty() {
                return Err(Error::unimplemented(
                    "creating symlinks in the input root is not supported",
                ));
            }
            Ok(())
        }
        .boxed()
    }

    async fn prepare_filesystem(
        &self,
        instance: &InstanceName,
        action: &Action,
        command: &Command,
    ) -> Result<()> {
        let input_root_digest = required_digest(&action.input_root_digest, "input_root_digest")?;

        // Copy input files into the build environment.
        remove_all(&self.directories.build_root).await?;
        self.create_input_directory(instance, &input_root_digest, &self.directories.build_root)
            .await?;

        // Ensure that the directories where output files will be written
        // exist, so the command does not have to create them itself.
        for output_file in &command.output_files {
            let relative = ForwardRelativePath::new(output_file)?;
            let path = self.directories.build_root.join(relative.as_path());
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        // Provide a clean temp directory.
        remove_all(&self.directories.temp_root).await?;
        create_build_dir(&self.directories.temp_root).await
    }

    async fn run_command(&self, action: &Action, command: &Command) -> Result<i32> {
        if command.arguments.is_empty() {
            return Err(Error::invalid_argument(
                "insufficient number of command arguments",
            ));
        }

        let working_directory = ForwardRelativePath::new(&command.working_directory)?;
        let working_directory = self
            .directories
            .build_root
            .join(working_directory.as_path());

        let mut cmd = tokio::process::Command::new(&command.arguments[0]);
        cmd.args(&command.arguments[1..]);
        cmd.current_dir(working_directory);

        // The child sees exactly HOME plus the declared variables, in
        // order; nothing is inherited from the executor's own environment.
        cmd.env_clear();
        cmd.env("HOME", &self.directories.temp_root);
        for variable in &command.environment_variables {
            cmd.env(&variable.name, &variable.value);
        }

        cmd.stdin(std::process::Stdio::null());
        cmd.stdout(std::fs::File::create(&self.directories.stdout_path)?);
        cmd.stderr(std::fs::File::create(&self.directories.stderr_path)?);

        if let Some(credentials) = self.credentials {
            cmd.uid(credentials.uid);
            cmd.gid(credentials.gid);
        }

        let timeout = match &action.timeout {
            Some(timeout) => Some(
                std::time::Duration::try_from(timeout.clone())
                    .map_err(|e| Error::invalid_argument("invalid action timeout").with_source(e))?,
            ),
            None => None,
        };

        tracing::info!(argv = ?command.arguments, "running command");

        match gather_status(cmd, timeout).await? {
            GatherStatus::Finished { exit_code } => Ok(exit_code),
            GatherStatus::TimedOut(duration) => Err(Error::deadline_exceeded(format!(
                "command did not complete within {:?}",
                duration
            ))),
        }
    }

    /// Uploads one level of an output directory, returning its Directory
    /// message and accumulating every descendant directory into `children`
    /// keyed by digest, post-order, so the flat Tree encoding is
    /// deterministic and deduplicated.
    fn upload_directory<'a>(
        &'a self,
        instance: &'a InstanceName,
        path: &'a Path,
        children: &'a mut IndexMap<DirectoryDigest, Directory>,
    ) -> BoxFuture<'a, Result<Directory>> {
        async move {
            let mut read_dir = tokio::fs::read_dir(path).await?;
            let mut entries = Vec::new();
            while let Some(entry) = read_dir.next_entry().await? {
                entries.push(entry);
            }
            // Canonical Directory messages list entries in lexicographical
            // order; this also keeps digests independent of readdir order.
            entries.sort_by_key(|entry| entry.file_name());

            let mut directory = Directory::default();
            for entry in entries {
                let name = entry.file_name().into_string().map_err(|name| {
                    Error::failed_precondition(format!(
                        "output name {:?} is not valid UTF-8",
                        name
                    ))
                })?;
                let entry_path = entry.path();
                let file_type = entry.file_type().await?;

                if file_type.is_file() {
                    let (digest, is_executable) =
                        self.storage.put_file(instance, &entry_path).await?;
                    directory.files.push(FileNode {
                        name,
                        digest: Some(digest.to_proto()),
                        is_executable,
                    });
                } else if file_type.is_dir() {
                    let child = self
                        .upload_directory(instance, &entry_path, &mut *children)
                        .await?;
                    let digest = DirectoryDigest::from_message(&child);
                    directory.directories.push(DirectoryNode {
                        name,
                        digest: Some(digest.to_proto()),
                    });
                    children.insert(digest, child);
                } else if file_type.is_symlink() {
                    let target = tokio::fs::read_link(&entry_path).await?;
                    let target = target.into_os_string().into_string().map_err(|target| {
                        Error::failed_precondition(format!(
                            "symlink target {:?} is not valid UTF-8",
                            target
                        ))
                    })?;
                    directory.symlinks.push(SymlinkNode { name, target });
                } else {
                    return Err(Error::failed_precondition(format!(
                        "path {} has an unsupported file type",
                        entry_path.display()
                    )));
                }
            }
            Ok(directory)
        }
        .boxed()
    }

    /// Gathers all directory objects under `path` and uploads them as one
    /// flat Tree message. Returns `None` when the directory was never
    /// produced.
    async fn upload_tree(
        &self,
        instance: &InstanceName,
        path: &Path,
    ) -> Result<Option<TreeDigest>> {
        match tokio::fs::metadata(path).await {
            Ok(metadata) if metadata.is_dir() => {}
            Ok(_) => {
                return Err(Error::failed_precondition(format!(
                    "output directory {} is not a directory",
                    path.display()
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        }

        let mut children = IndexMap::new();
        let root = self.upload_directory(instance, path, &mut children).await?;
        let tree = Tree {
            root: Some(root),
            children: children.into_values().collect(),
        };
        Ok(Some(self.storage.put_tree(instance, &tree).await?))
    }

    async fn upload_outputs(
        &self,
        instance: &InstanceName,
        command: &Command,
        exit_code: i32,
    ) -> Result<ActionResult> {
        let (stdout_digest, _) = self
            .storage
            .put_file(instance, &self.directories.stdout_path)
            .await?;
        let (stderr_digest, _) = self
            .storage
            .put_file(instance, &self.directories.stderr_path)
            .await?;

        let mut result = ActionResult {
            exit_code,
            stdout_digest: Some(stdout_digest.to_proto()),
            stderr_digest: Some(stderr_digest.to_proto()),
            ..Default::default()
        };

        for output_file in &command.output_files {
            let relative = ForwardRelativePath::new(output_file)?;
            let path = self.directories.build_root.join(relative.as_path());
            match self.storage.put_file(instance, &path).await {
                Ok((digest, is_executable)) => result.output_files.push(OutputFile {
                    path: output_file.clone(),
                    digest: Some(digest.to_proto()),
                    is_executable,
                }),
                // The action did not produce this declared output. Not an
                // error; the result simply omits it.
                Err(e) if e.code() == Code::NotFound => {}
                Err(e) => return Err(e),
            }
        }

        for output_directory in &command.output_directories {
            let relative = ForwardRelativePath::new(output_directory)?;
            let path = self.directories.build_root.join(relative.as_path());
            if let Some(digest) = self.upload_tree(instance, &path).await? {
                result.output_directories.push(OutputDirectory {
                    path: output_directory.clone(),
                    tree_digest: Some(digest.to_proto()),
                });
            }
        }

        Ok(result)
    }

    async fn execute_inner(&self, request: &ExecuteRequest) -> Result<(ActionResult, bool)> {
        let instance = InstanceName::new(&request.instance_name);

        // Fetch action and command.
        let stage = Instant::now();
        let action_digest = required_digest(&request.action_digest, "action_digest")?;
        let action = self.storage.get_action(&instance, &action_digest).await?;
        let command_digest = required_digest(&action.command_digest, "command_digest")?;
        let command = self.storage.get_command(&instance, &command_digest).await?;
        tracing::debug!(stage = "get_action_command", elapsed = ?stage.elapsed());

        // Set up inputs.
        let stage = Instant::now();
        self.prepare_filesystem(&instance, &action, &command).await?;
        tracing::debug!(stage = "prepare_filesystem", elapsed = ?stage.elapsed());

        // Invoke the command. A non-zero exit is not an executor error; it
        // is recorded in the result below.
        let stage = Instant::now();
        let exit_code = self.run_command(&action, &command).await?;
        tracing::debug!(stage = "run_command", elapsed = ?stage.elapsed());

        // Upload command output.
        let stage = Instant::now();
        let result = self.upload_outputs(&instance, &command, exit_code).await?;
        tracing::debug!(stage = "upload_output", elapsed = ?stage.elapsed());

        let cacheable = !action.do_not_cache && result.exit_code == 0;
        Ok((result, cacheable))
    }
}

#[async_trait]
impl BuildExecutor for LocalBuildExecutor {
    async fn execute(&self, request: &ExecuteRequest) -> (ExecuteResponse, bool) {
        match self.execute_inner(request).await {
            Ok((result, cacheable)) => (
                ExecuteResponse {
                    result: Some(result),
                    cached_result: false,
                    status: None,
                    message: String::new(),
                },
                cacheable,
            ),
            Err(e) => (
                ExecuteResponse {
                    result: None,
                    cached_result: false,
                    status: Some(e.to_status()),
                    message: String::new(),
                },
                false,
            ),
        }
    }
}
