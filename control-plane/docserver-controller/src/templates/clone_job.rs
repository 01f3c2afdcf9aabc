use k8s_openapi::api::batch::v1::{Job, JobSpec};
use k8s_openapi::api::core::v1::{
    ConfigMapVolumeSource, Container, EnvVar, EnvVarSource,
    PersistentVolumeClaimVolumeSource, PodSpec, PodTemplateSpec,
    SecretKeySelector, SecretVolumeSource, Volume, VolumeMount,
};
use kube::ResourceExt;
use kube::api::ObjectMeta;

use super::{
    SOURCE_MOUNT_PATH, SOURCE_VOLUME, clone_job_name, labels, owner_reference,
    server_name,
};
use crate::crd::DocServer;

/// Job-level retries before the clone is considered failed.
pub const CLONE_BACKOFF_LIMIT: i32 = 5;

pub const SSH_CONFIG_VOLUME: &str = "sshconfig";
pub const SSH_CONFIG_MOUNT_PATH: &str = "/opt/gitpod/sshconfig";
pub const SSH_KEY_VOLUME: &str = "privatekey";
pub const SSH_KEY_MOUNT_PATH: &str = "/opt/gitpod/privatekey";
pub const TLS_VOLUME: &str = "cacert";
// Mounted for the clone image; no env var points the tool at it.
pub const TLS_MOUNT_PATH: &str = "/opt/gitpod/certs";

pub fn build_clone_job(ds: &DocServer) -> Job {
    let ds_name = ds.name_any();
    let target = &ds.spec.target;

    let mut env = vec![
        plain_env("GIT_URL", &target.url),
        plain_env("GIT_BRANCH", target.effective_branch()),
        plain_env("GIT_DEPTH", &target.effective_depth().to_string()),
        plain_env("GIT_SSL_VERIFY", &target.effective_ssl_verify().to_string()),
    ];
    let mut volume_mounts = vec![VolumeMount {
        name: SOURCE_VOLUME.to_string(),
        mount_path: SOURCE_MOUNT_PATH.to_string(),
        ..Default::default()
    }];
    let mut volumes = vec![Volume {
        name: SOURCE_VOLUME.to_string(),
        persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
            claim_name: server_name(&ds_name),
            ..Default::default()
        }),
        ..Default::default()
    }];

    if let Some(secret) = target.basic_auth_secret() {
        env.push(secret_env("GIT_USERNAME", secret, "username"));
        env.push(secret_env("GIT_PASSWORD", secret, "password"));
    }

    if let Some(ssh) = target.ssh_secret.as_ref() {
        volume_mounts.push(read_only_mount(SSH_CONFIG_VOLUME, SSH_CONFIG_MOUNT_PATH));
        volume_mounts.push(read_only_mount(SSH_KEY_VOLUME, SSH_KEY_MOUNT_PATH));
        volumes.push(Volume {
            name: SSH_CONFIG_VOLUME.to_string(),
            config_map: Some(ConfigMapVolumeSource {
                name: ssh.config.clone(),
                ..Default::default()
            }),
            ..Default::default()
        });
        volumes.push(secret_volume(SSH_KEY_VOLUME, &ssh.private_key));
    }

    if let Some(secret) = target.tls_secret() {
        volume_mounts.push(read_only_mount(TLS_VOLUME, TLS_MOUNT_PATH));
        volumes.push(secret_volume(TLS_VOLUME, secret));
    }

    let container = Container {
        name: "gitpod".to_string(),
        image: Some(ds.spec.effective_gitpod_image().to_string()),
        image_pull_policy: Some("IfNotPresent".to_string()),
        env: Some(env),
        volume_mounts: Some(volume_mounts),
        ..Default::default()
    };

    Job {
        metadata: ObjectMeta {
            name: Some(clone_job_name(&ds_name)),
            namespace: ds.namespace(),
            labels: Some(labels(&ds_name)),
            owner_references: Some(vec![owner_reference(ds, true)]),
            ..Default::default()
        },
        spec: Some(JobSpec {
            backoff_limit: Some(CLONE_BACKOFF_LIMIT),
            completions: Some(1),
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels(&ds_name)),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![container],
                    restart_policy: Some("Never".to_string()),
                    volumes: Some(volumes),
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn plain_env(name: &str, value: &str) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value: Some(value.to_string()),
        ..Default::default()
    }
}

fn secret_env(name: &str, secret: &str, key: &str) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value_from: Some(EnvVarSource {
            secret_key_ref: Some(SecretKeySelector {
                name: secret.to_string(),
                key: key.to_string(),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn read_only_mount(volume: &str, path: &str) -> VolumeMount {
    VolumeMount {
        name: volume.to_string(),
        mount_path: path.to_string(),
        read_only: Some(true),
        ..Default::default()
    }
}

fn secret_volume(volume: &str, secret: &str) -> Volume {
    Volume {
        name: volume.to_string(),
        secret: Some(SecretVolumeSource {
            secret_name: Some(secret.to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}
