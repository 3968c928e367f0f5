/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use std::sync::Arc;

use bytes::Bytes;
use forge_blobstore::BlobAccess;
use forge_blobstore::MemoryBlobAccess;
use forge_blobstore::ValidatingBlobAccess;
use forge_builder::BuildDirectories;
use forge_builder::BuildExecutor;
use forge_builder::CasInputFileExposer;
use forge_builder::LocalBuildExecutor;
use forge_cas::BlobAccessContentAddressableStorage;
use forge_cas::ContentAddressableStorage;
use forge_core::digest::BlobDigest;
use forge_core::instance::InstanceName;
use forge_proto::build::bazel::remote::execution::v2::command::EnvironmentVariable;
use forge_proto::build::bazel::remote::execution::v2::Action;
use forge_proto::build::bazel::remote::execution::v2::Command;
use forge_proto::build::bazel::remote::execution::v2::Digest;
use forge_proto::build::bazel::remote::execution::v2::Directory;
use forge_proto::build::bazel::remote::execution::v2::ExecuteRequest;
use forge_proto::build::bazel::remote::execution::v2::ExecuteResponse;
use forge_proto::build::bazel::remote::execution::v2::FileNode;
use forge_proto::build::bazel::remote::execution::v2::SymlinkNode;
use forge_proto::build::bazel::remote::execution::v2::Tree;
use prost::Message;

struct Fixture {
    instance: InstanceName,
    blob_access: Arc<dyn BlobAccess>,
    directories: BuildDirectories,
    executor: LocalBuildExecutor,
    _dir: tempfile::TempDir,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let blob_access: Arc<dyn BlobAccess> = Arc::new(ValidatingBlobAccess::new(Arc::new(
        MemoryBlobAccess::new(),
    )));
    let storage: Arc<dyn ContentAddressableStorage> = Arc::new(
        BlobAccessContentAddressableStorage::new(blob_access.clone()),
    );
    let directories = BuildDirectories {
        build_root: dir.path().join("build"),
        temp_root: dir.path().join("tmp"),
        stdout_path: dir.path().join("stdout"),
        stderr_path: dir.path().join("stderr"),
    };
    let executor = LocalBuildExecutor::new(
        storage.clone(),
        Arc::new(CasInputFileExposer::new(storage)),
        directories.clone(),
        None,
    );
    Fixture {
        instance: InstanceName::default(),
        blob_access,
        directories,
        executor,
        _dir: dir,
    }
}

impl Fixture {
    async fn put_blob(&self, data: &[u8]) -> BlobDigest {
        let digest = BlobDigest::from_bytes(data);
        self.blob_access
            .put(&self.instance, &digest, Bytes::copy_from_slice(data))
            .await
            .unwrap();
        digest
    }

    async fn put_message<M: Message>(&self, message: &M) -> Digest {
        let digest = self.put_blob(&message.encode_to_vec()).await;
        digest.to_proto()
    }

    async fn get_blob(&self, digest: &Digest) -> Bytes {
        self.blob_access
            .get(&self.instance, &BlobDigest::from_proto(digest).unwrap())
            .await
            .unwrap()
    }

    async fn execute_action(&self, action: Action) -> (ExecuteResponse, bool) {
        let action_digest = self.put_message(&action).await;
        self.executor
            .execute(&ExecuteRequest {
                instance_name: self.instance.as_str().to_owned(),
                skip_cache_lookup: false,
                action_digest: Some(action_digest),
            })
            .await
    }

    async fn execute(&self, command: Command, input_root: Directory) -> (ExecuteResponse, bool) {
        let action = Action {
            command_digest: Some(self.put_message(&command).await),
            input_root_digest: Some(self.put_message(&input_root).await),
            timeout: None,
            do_not_cache: false,
        };
        self.execute_action(action).await
    }
}

fn command(arguments: &[&str]) -> Command {
    Command {
        arguments: arguments.iter().map(|s| (*s).to_owned()).collect(),
        ..Default::default()
    }
}

fn status_code(response: &ExecuteResponse) -> i32 {
    response.status.as_ref().map(|s| s.code).unwrap_or(0)
}

fn empty_blob_digest() -> Digest {
    BlobDigest::empty().to_proto()
}

#[tokio::test]
async fn test_trivial_command_succeeds_and_is_cacheable() {
    let f = fixture();
    let (response, cacheable) = f.execute(command(&["/bin/true"]), Directory::default()).await;

    assert_eq!(0, status_code(&response), "status: {:?}", response.status);
    assert!(cacheable);
    let result = response.result.unwrap();
    assert_eq!(0, result.exit_code);
    assert_eq!(Some(empty_blob_digest()), result.stdout_digest);
    assert_eq!(Some(empty_blob_digest()), result.stderr_digest);
    assert!(result.output_files.is_empty());
    assert!(result.output_directories.is_empty());
}

#[tokio::test]
async fn test_non_zero_exit_is_reported_not_cached() {
    let f = fixture();
    let (response, cacheable) = f
        .execute(command(&["/bin/false"]), Directory::default())
        .await;

    assert_eq!(0, status_code(&response));
    assert!(!cacheable);
    let result = response.result.unwrap();
    assert_eq!(1, result.exit_code);
    assert!(result.output_files.is_empty());
}

#[tokio::test]
async fn test_file_transform_round_trips_content() {
    let f = fixture();
    let hello = f.put_blob(b"hello").await;
    let input_root = Directory {
        files: vec![FileNode {
            name: "in.txt".to_owned(),
            digest: Some(hello.to_proto()),
            is_executable: false,
        }],
        ..Default::default()
    };
    let mut cmd = command(&["/bin/cp", "in.txt", "out.txt"]);
    cmd.output_files = vec!["out.txt".to_owned()];

    let (response, cacheable) = f.execute(cmd, input_root).await;

    assert_eq!(0, status_code(&response), "status: {:?}", response.status);
    assert!(cacheable);
    let result = response.result.unwrap();
    assert_eq!(1, result.output_files.len());
    let output = &result.output_files[0];
    assert_eq!("out.txt", output.path);
    assert_eq!(Some(hello.to_proto()), output.digest);
    assert!(!output.is_executable);
    assert_eq!(
        Bytes::from_static(b"hello"),
        f.get_blob(output.digest.as_ref().unwrap()).await
    );
}

#[tokio::test]
async fn test_directory_output_builds_a_flat_tree() {
    let f = fixture();
    let mut cmd = command(&[
        "/bin/sh",
        "-c",
        "mkdir -p outdir/b && printf A > outdir/a && printf C > outdir/b/c",
    ]);
    cmd.environment_variables = vec![EnvironmentVariable {
        name: "PATH".to_owned(),
        value: "/usr/bin:/bin".to_owned(),
    }];
    cmd.output_directories = vec!["outdir".to_owned()];

    let (response, cacheable) = f.execute(cmd, Directory::default()).await;

    assert_eq!(0, status_code(&response), "status: {:?}", response.status);
    assert!(cacheable);
    let result = response.result.unwrap();
    assert_eq!(1, result.output_directories.len());
    assert_eq!("outdir", result.output_directories[0].path);

    let tree_digest = result.output_directories[0].tree_digest.as_ref().unwrap();
    let tree = Tree::decode(f.get_blob(tree_digest).await).unwrap();

    let root = tree.root.unwrap();
    assert_eq!(1, root.files.len());
    assert_eq!("a", root.files[0].name);
    assert_eq!(
        BlobDigest::from_bytes(b"A").to_proto(),
        root.files[0].digest.clone().unwrap()
    );
    assert_eq!(1, root.directories.len());
    assert_eq!("b", root.directories[0].name);

    // The child directory referenced from the root is bundled in the tree.
    assert_eq!(1, tree.children.len());
    let child = &tree.children[0];
    assert_eq!(
        root.directories[0].digest.clone().unwrap(),
        forge_core::digest::DirectoryDigest::from_message(child).to_proto()
    );
    assert_eq!(1, child.files.len());
    assert_eq!("c", child.files[0].name);
    assert_eq!(
        BlobDigest::from_bytes(b"C").to_proto(),
        child.files[0].digest.clone().unwrap()
    );
}

#[tokio::test]
async fn test_do_not_cache_is_honored() {
    let f = fixture();
    let action = Action {
        command_digest: Some(f.put_message(&command(&["/bin/true"])).await),
        input_root_digest: Some(f.put_message(&Directory::default()).await),
        timeout: None,
        do_not_cache: true,
    };
    let (response, cacheable) = f.execute_action(action).await;

    assert_eq!(0, status_code(&response));
    assert_eq!(0, response.result.unwrap().exit_code);
    assert!(!cacheable);
}

#[tokio::test]
async fn test_environment_is_reset_to_declared_variables() {
    let f = fixture();
    let mut cmd = command(&["/bin/sh", "-c", "printf '%s:%s:%s' \"$HOME\" \"$FOO\" \"$PATH\""]);
    cmd.environment_variables = vec![EnvironmentVariable {
        name: "FOO".to_owned(),
        value: "bar".to_owned(),
    }];

    let (response, _) = f.execute(cmd, Directory::default()).await;

    assert_eq!(0, status_code(&response), "status: {:?}", response.status);
    let result = response.result.unwrap();
    let stdout = f.get_blob(result.stdout_digest.as_ref().unwrap()).await;
    // HOME points at the temp root, FOO is the declared value, and PATH is
    // not inherited from the executor.
    assert_eq!(
        format!("{}:bar:", f.directories.temp_root.display()).into_bytes(),
        stdout.to_vec()
    );
}

#[tokio::test]
async fn test_stdout_and_stderr_are_captured() {
    let f = fixture();
    let cmd = command(&["/bin/sh", "-c", "echo out; echo err >&2"]);

    let (response, _) = f.execute(cmd, Directory::default()).await;

    let result = response.result.unwrap();
    assert_eq!(
        Bytes::from_static(b"out\n"),
        f.get_blob(result.stdout_digest.as_ref().unwrap()).await
    );
    assert_eq!(
        Bytes::from_static(b"err\n"),
        f.get_blob(result.stderr_digest.as_ref().unwrap()).await
    );
}

#[tokio::test]
async fn test_missing_declared_output_is_skipped() {
    let f = fixture();
    let mut cmd = command(&["/bin/true"]);
    cmd.output_files = vec!["never/written.txt".to_owned()];

    let (response, cacheable) = f.execute(cmd, Directory::default()).await;

    assert_eq!(0, status_code(&response), "status: {:?}", response.status);
    assert!(cacheable);
    assert!(response.result.unwrap().output_files.is_empty());
}

#[tokio::test]
async fn test_missing_declared_output_directory_is_skipped() {
    let f = fixture();
    let mut cmd = command(&["/bin/true"]);
    cmd.output_directories = vec!["never-made".to_owned()];

    let (response, _) = f.execute(cmd, Directory::default()).await;

    assert_eq!(0, status_code(&response), "status: {:?}", response.status);
    assert!(response.result.unwrap().output_directories.is_empty());
}

#[tokio::test]
async fn test_empty_argument_vector_is_invalid() {
    let f = fixture();
    let (response, cacheable) = f.execute(command(&[]), Directory::default()).await;

    assert_eq!(3, status_code(&response)); // INVALID_ARGUMENT
    assert!(!cacheable);
    assert!(response.result.is_none());
}

#[tokio::test]
async fn test_parent_traversal_in_output_path_is_invalid() {
    let f = fixture();
    let mut cmd = command(&["/bin/true"]);
    cmd.output_files = vec!["../escape.txt".to_owned()];

    let (response, _) = f.execute(cmd, Directory::default()).await;
    assert_eq!(3, status_code(&response));
}

#[tokio::test]
async fn test_parent_traversal_in_working_directory_is_invalid() {
    let f = fixture();
    let mut cmd = command(&["/bin/true"]);
    cmd.working_directory = "..".to_owned();

    let (response, _) = f.execute(cmd, Directory::default()).await;
    assert_eq!(3, status_code(&response));
}

#[tokio::test]
async fn test_unsafe_input_file_name_is_invalid() {
    let f = fixture();
    let payload = f.put_blob(b"payload").await;
    let input_root = Directory {
        files: vec![FileNode {
            name: "../evil".to_owned(),
            digest: Some(payload.to_proto()),
            is_executable: false,
        }],
        ..Default::default()
    };

    let (response, _) = f.execute(command(&["/bin/true"]), input_root).await;
    assert_eq!(3, status_code(&response));
}

#[tokio::test]
async fn test_input_root_symlink_is_unimplemented() {
    let f = fixture();
    let input_root = Directory {
        symlinks: vec![SymlinkNode {
            name: "link".to_owned(),
            target: "/etc/passwd".to_owned(),
        }],
        ..Default::default()
    };

    let (response, cacheable) = f.execute(command(&["/bin/true"]), input_root).await;

    assert_eq!(12, status_code(&response)); // UNIMPLEMENTED
    assert!(!cacheable);
}

#[tokio::test]
async fn test_timeout_expiry_is_deadline_exceeded() {
    let f = fixture();
    let mut sleep = command(&["/bin/sh", "-c", "sleep 10"]);
    sleep.environment_variables = vec![EnvironmentVariable {
        name: "PATH".to_owned(),
        value: "/usr/bin:/bin".to_owned(),
    }];
    let action = Action {
        command_digest: Some(f.put_message(&sleep).await),
        input_root_digest: Some(f.put_message(&Directory::default()).await),
        timeout: Some(prost_types::Duration {
            seconds: 0,
            nanos: 200_000_000,
        }),
        do_not_cache: false,
    };

    let start = std::time::Instant::now();
    let (response, cacheable) = f.execute_action(action).await;

    assert_eq!(4, status_code(&response)); // DEADLINE_EXCEEDED
    assert!(!cacheable);
    assert!(start.elapsed() < std::time::Duration::from_secs(5));
}

#[tokio::test]
async fn test_absent_action_is_not_found() {
    let f = fixture();
    let (response, cacheable) = f
        .executor
        .execute(&ExecuteRequest {
            instance_name: String::new(),
            skip_cache_lookup: false,
            action_digest: Some(BlobDigest::from_bytes(b"never uploaded").to_proto()),
        })
        .await;

    assert_eq!(5, status_code(&response)); // NOT_FOUND
    assert!(!cacheable);
}

#[tokio::test]
async fn test_identical_actions_produce_identical_results() {
    let f = fixture();
    let hello = f.put_blob(b"hello").await;
    let input_root = Directory {
        files: vec![FileNode {
            name: "in.txt".to_owned(),
            digest: Some(hello.to_proto()),
            is_executable: false,
        }],
        ..Default::default()
    };
    let mut cmd = command(&["/bin/cp", "in.txt", "out.txt"]);
    cmd.output_files = vec!["out.txt".to_owned()];

    let (first, _) = f.execute(cmd.clone(), input_root.clone()).await;
    let (second, _) = f.execute(cmd, input_root).await;

    assert_eq!(first.result.unwrap(), second.result.unwrap());
}

#[tokio::test]
async fn test_full_storage_chain_stages_inputs_through_the_pool() {
    use std::num::NonZeroUsize;

    use forge_cas::DirectoryCachingContentAddressableStorage;
    use forge_cas::HardlinkingContentAddressableStorage;

    let dir = tempfile::tempdir().unwrap();
    let blob_access: Arc<dyn BlobAccess> = Arc::new(ValidatingBlobAccess::new(Arc::new(
        MemoryBlobAccess::new(),
    )));
    let pool = dir.path().join("pool");
    let storage: Arc<dyn ContentAddressableStorage> =
        Arc::new(
            HardlinkingContentAddressableStorage::new(
                Arc::new(DirectoryCachingContentAddressableStorage::new(
                    Arc::new(BlobAccessContentAddressableStorage::new(blob_access.clone())),
                    NonZeroUsize::new(128).unwrap(),
                )),
                pool.clone(),
                1024,
                1 << 20,
            )
            .unwrap(),
        );
    let directories = BuildDirectories {
        build_root: dir.path().join("build"),
        temp_root: dir.path().join("tmp"),
        stdout_path: dir.path().join("stdout"),
        stderr_path: dir.path().join("stderr"),
    };
    let f = Fixture {
        instance: InstanceName::default(),
        blob_access,
        directories: directories.clone(),
        executor: LocalBuildExecutor::new(
            storage.clone(),
            Arc::new(CasInputFileExposer::new(storage)),
            directories,
            None,
        ),
        _dir: dir,
    };

    let hello = f.put_blob(b"hello").await;
    let input_root = Directory {
        files: vec![FileNode {
            name: "in.txt".to_owned(),
            digest: Some(hello.to_proto()),
            is_executable: false,
        }],
        ..Default::default()
    };
    let mut cmd = command(&["/bin/cp", "in.txt", "out.txt"]);
    cmd.output_files = vec!["out.txt".to_owned()];

    let (response, cacheable) = f.execute(cmd, input_root).await;

    assert_eq!(0, status_code(&response), "status: {:?}", response.status);
    assert!(cacheable);
    assert_eq!(
        Some(hello.to_proto()),
        response.result.unwrap().output_files[0].digest
    );
    // The input file was staged out of the hardlink pool.
    assert!(pool.join(hello.hash_hex()).exists());
}

#[tokio::test]
async fn test_executable_input_can_be_run() {
    let f = fixture();
    let script = f.put_blob(b"#!/bin/sh\nprintf ran\n").await;
    let input_root = Directory {
        files: vec![FileNode {
            name: "tool.sh".to_owned(),
            digest: Some(script.to_proto()),
            is_executable: true,
        }],
        ..Default::default()
    };

    let (response, cacheable) = f.execute(command(&["./tool.sh"]), input_root).await;

    assert_eq!(0, status_code(&response), "status: {:?}", response.status);
    assert!(cacheable);
    let result = response.result.unwrap();
    assert_eq!(
        Bytes::from_static(b"ran"),
        f.get_blob(result.stdout_digest.as_ref().unwrap()).await
    );
}
