//! Database and cache service containers
//!
//! Each container goes through a small state machine: running containers are
//! left alone, stopped ones are started (and recreated if that fails), absent
//! ones are created. A Postgres server already listening natively takes
//! precedence over the database container.

use super::{Command, CommandContext, FailurePolicy, Platform};
use crate::core::error::{CommandError, CommandResult};
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Waits used while bringing Docker and containers up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DockerTimings {
    /// Pause after asking the platform to start the Docker daemon
    pub daemon_start_wait: Duration,
    /// Interval between container state checks
    pub poll_interval: Duration,
    /// How long a container may take to report running
    pub ready_timeout: Duration,
}

impl Default for DockerTimings {
    fn default() -> Self {
        Self {
            daemon_start_wait: Duration::from_secs(10),
            poll_interval: Duration::from_secs(1),
            ready_timeout: Duration::from_secs(30),
        }
    }
}

impl DockerTimings {
    /// No waiting at all
    pub fn immediate() -> Self {
        Self {
            daemon_start_wait: Duration::ZERO,
            poll_interval: Duration::ZERO,
            ready_timeout: Duration::ZERO,
        }
    }
}

/// What `docker run` needs to create a container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    pub port: u16,
    pub internal_port: u16,
    pub env: Vec<(String, String)>,
    pub volume: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerState {
    Absent,
    Stopped,
    Running,
}

pub struct DockerCommand {
    ctx: CommandContext,
    timings: DockerTimings,
    native_pg_port: Option<u16>,
    daemon_checked: bool,
}

impl DockerCommand {
    pub fn new(ctx: CommandContext) -> Self {
        Self {
            ctx,
            timings: DockerTimings::default(),
            native_pg_port: None,
            daemon_checked: false,
        }
    }

    pub fn boxed(ctx: &CommandContext) -> Box<dyn Command> {
        Box::new(Self::new(ctx.clone()))
    }

    pub fn with_timings(mut self, timings: DockerTimings) -> Self {
        self.timings = timings;
        self
    }

    /// Port of a natively running Postgres found during `execute`
    pub fn native_pg_port(&self) -> Option<u16> {
        self.native_pg_port
    }

    pub fn postgres_spec(&self) -> ContainerSpec {
        let db = &self.ctx.config.database;
        ContainerSpec {
            name: db.name.clone(),
            image: format!("postgres:{}", db.version),
            port: db.port,
            internal_port: 5432,
            env: vec![("POSTGRES_PASSWORD".to_string(), db.password.clone())],
            volume: Some(format!("{}:/var/lib/postgresql/data", db.name)),
        }
    }

    pub fn redis_spec(&self) -> ContainerSpec {
        let redis = &self.ctx.config.redis;
        ContainerSpec {
            name: redis.name.clone(),
            image: format!("redis:{}", redis.version),
            port: redis.port,
            internal_port: 6379,
            env: Vec::new(),
            volume: None,
        }
    }

    fn docker_available(&self) -> bool {
        self.ctx.shell.has_program("docker")
            || ["/usr/bin/docker", "/usr/local/bin/docker"]
                .iter()
                .any(|path| Path::new(path).exists())
    }

    fn docker_running(&self) -> bool {
        self.ctx.succeeds(&self.ctx.command(["docker", "info"]))
    }

    fn ensure_docker_running(&mut self) -> CommandResult {
        if self.daemon_checked {
            return Ok(());
        }
        info!("Ensure Docker is running");
        if !self.docker_running() {
            info!("Starting Docker...");
            self.start_daemon();
            thread::sleep(self.timings.daemon_start_wait);
            if !self.docker_running() {
                return Err(CommandError::Failed(
                    "Docker is not running. Please start Docker manually.".to_string(),
                ));
            }
        }
        self.daemon_checked = true;
        Ok(())
    }

    fn start_daemon(&self) {
        let started = match self.ctx.platform {
            Platform::MacOs => self.ctx.succeeds(&self.ctx.command(["open", "-a", "Docker"])),
            Platform::Linux if self.ctx.shell.has_program("systemctl") => {
                info!("Attempting to start Docker service...");
                self.ctx
                    .succeeds(&self.ctx.command(["sudo", "systemctl", "start", "docker"]))
            }
            Platform::Linux => {
                info!("Docker service management not available. Please ensure Docker is running.");
                false
            }
            Platform::Other => {
                info!("Unsupported platform for automatic Docker startup");
                false
            }
        };
        if !started {
            warn!("Could not start the Docker daemon automatically");
        }
    }

    /// Candidate ports: the configured one, then the usual Postgres ports
    fn candidate_pg_ports(&self) -> Vec<u16> {
        let mut ports = vec![self.ctx.config.database.port];
        for port in [5432, 5433] {
            if !ports.contains(&port) {
                ports.push(port);
            }
        }
        ports
    }

    fn detect_native_postgres(&self) -> Option<u16> {
        let probe_with = if self.ctx.shell.has_program("pg_isready") {
            "pg_isready"
        } else if self.ctx.shell.has_program("psql") {
            "psql"
        } else {
            return None;
        };

        self.candidate_pg_ports().into_iter().find(|port| {
            let port = port.to_string();
            let probe = if probe_with == "pg_isready" {
                self.ctx.command(["pg_isready", "-h", "localhost", "-p", port.as_str()])
            } else {
                self.ctx.command([
                    "psql", "-h", "localhost", "-p", port.as_str(), "-U", "postgres", "-c", "\\q",
                ])
            };
            self.ctx.succeeds(&probe)
        })
    }

    pub fn container_state(&self, name: &str) -> ContainerState {
        let output = self
            .ctx
            .shell
            .run(&self.ctx.command(["docker", "inspect", "-f", "{{.State.Running}}", name]));
        if !output.success {
            ContainerState::Absent
        } else if output.stdout.trim() == "true" {
            ContainerState::Running
        } else {
            ContainerState::Stopped
        }
    }

    fn setup_container(&mut self, spec: &ContainerSpec) -> CommandResult {
        self.ensure_docker_running()?;
        info!("Checking {} container", spec.name);

        match self.container_state(&spec.name) {
            ContainerState::Running => {
                info!("{} container is already running", spec.name);
                return Ok(());
            }
            ContainerState::Stopped => {
                info!("Starting existing {} container", spec.name);
                if !self.ctx.succeeds(&self.ctx.command(["docker", "start", spec.name.as_str()])) {
                    info!("Removing failed {} container", spec.name);
                    self.ctx.system(
                        &self.ctx.command(["docker", "rm", "-f", spec.name.as_str()]),
                        FailurePolicy::Tolerate,
                    )?;
                    self.create_container(spec)?;
                }
            }
            ContainerState::Absent => self.create_container(spec)?,
        }

        self.wait_until_running(&spec.name)
    }

    fn create_container(&self, spec: &ContainerSpec) -> CommandResult {
        info!("Creating new {} container", spec.name);
        let mut argv = vec![
            "docker".to_string(),
            "run".to_string(),
            "-d".to_string(),
            "--name".to_string(),
            spec.name.clone(),
            "-p".to_string(),
            format!("{}:{}", spec.port, spec.internal_port),
        ];
        for (key, value) in &spec.env {
            argv.push("-e".to_string());
            argv.push(format!("{}={}", key, value));
        }
        if let Some(volume) = &spec.volume {
            argv.push("-v".to_string());
            argv.push(volume.clone());
        }
        argv.push(spec.image.clone());

        self.ctx.run(&self.ctx.command(argv))?;
        Ok(())
    }

    fn wait_until_running(&self, name: &str) -> CommandResult {
        let deadline = Instant::now() + self.timings.ready_timeout;
        loop {
            if self.container_state(name) == ContainerState::Running {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(CommandError::Failed(format!("{} container failed to start", name)));
            }
            thread::sleep(self.timings.poll_interval);
        }
    }
}

impl Command for DockerCommand {
    fn name(&self) -> &str {
        "docker"
    }

    fn description(&self) -> String {
        "Setup Docker containers".to_string()
    }

    fn can_execute(&self) -> bool {
        self.docker_available()
    }

    fn failure_policy(&self) -> FailurePolicy {
        FailurePolicy::Tolerate
    }

    fn execute(&mut self) -> CommandResult {
        match self.detect_native_postgres() {
            Some(port) => {
                info!(
                    "Native PostgreSQL detected on port {}, skipping Docker container setup",
                    port
                );
                self.native_pg_port = Some(port);
                self.ctx.env.set_default("DB_PORT", &port.to_string());
            }
            None => {
                let spec = self.postgres_spec();
                self.setup_container(&spec)?;
            }
        }

        let spec = self.redis_spec();
        self.setup_container(&spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Configuration;
    use crate::core::env::{EnvStore, MemoryEnv};
    use crate::shell::MockShell;
    use std::sync::Arc;

    fn docker(shell: &MockShell, env: Arc<MemoryEnv>) -> DockerCommand {
        let ctx = CommandContext::new(Arc::new(Configuration::default()), "/app", Arc::new(shell.clone()))
            .with_env(env)
            .with_platform(Platform::Linux);
        DockerCommand::new(ctx).with_timings(DockerTimings::immediate())
    }

    fn without_native_postgres(shell: &MockShell) {
        shell.fail("which pg_isready", "");
        shell.fail("which psql", "");
    }

    #[test]
    fn test_native_postgres_skips_database_container() {
        let shell = MockShell::new();
        shell.fail("pg_isready -h localhost -p 5432", "no response");
        shell.succeed("pg_isready -h localhost -p 5433", "accepting connections");
        shell.succeed("{{.State.Running}} redis-app", "true");
        let env = Arc::new(MemoryEnv::new());

        let mut cmd = docker(&shell, env.clone());
        cmd.execute().unwrap();

        assert_eq!(cmd.native_pg_port(), Some(5433));
        assert_eq!(env.get("DB_PORT").as_deref(), Some("5433"));
        assert!(!shell.ran("db-app"));
    }

    #[test]
    fn test_native_postgres_does_not_override_db_port() {
        let shell = MockShell::new();
        shell.succeed("{{.State.Running}}", "true");
        let env = Arc::new(MemoryEnv::with_vars([("DB_PORT", "6543")]));

        docker(&shell, env.clone()).execute().unwrap();
        assert_eq!(env.get("DB_PORT").as_deref(), Some("6543"));
    }

    #[test]
    fn test_running_containers_are_left_alone() {
        let shell = MockShell::new();
        without_native_postgres(&shell);
        shell.succeed("{{.State.Running}}", "true");

        docker(&shell, Arc::new(MemoryEnv::new())).execute().unwrap();
        assert!(!shell.ran("docker run"));
        assert!(!shell.ran("docker start"));
    }

    #[test]
    fn test_absent_container_is_created() {
        let shell = MockShell::new();
        without_native_postgres(&shell);
        shell
            .fail("{{.State.Running}} db-app", "No such object")
            .succeed("{{.State.Running}} db-app", "true");
        shell.succeed("{{.State.Running}} redis-app", "true");

        docker(&shell, Arc::new(MemoryEnv::new())).execute().unwrap();
        assert!(shell.ran(
            "docker run -d --name db-app -p 5432:5432 -e POSTGRES_PASSWORD=postgres -v db-app:/var/lib/postgresql/data postgres:14"
        ));
        assert!(!shell.ran("--name redis-app"));
    }

    #[test]
    fn test_stopped_container_is_recreated_when_start_fails() {
        let shell = MockShell::new();
        without_native_postgres(&shell);
        shell.succeed("{{.State.Running}} db-app", "true");
        shell
            .succeed("{{.State.Running}} redis-app", "false")
            .succeed("{{.State.Running}} redis-app", "true");
        shell.fail("docker start redis-app", "container is broken");

        docker(&shell, Arc::new(MemoryEnv::new())).execute().unwrap();
        let rm = shell.position("docker rm -f redis-app").unwrap();
        let run = shell.position("docker run -d --name redis-app -p 6379:6379 redis:latest").unwrap();
        assert!(rm < run);
    }

    #[test]
    fn test_container_that_never_starts_fails() {
        let shell = MockShell::new();
        without_native_postgres(&shell);
        shell.succeed("{{.State.Running}}", "false");

        let err = docker(&shell, Arc::new(MemoryEnv::new())).execute().unwrap_err();
        assert_eq!(err.to_string(), "db-app container failed to start");
    }

    #[test]
    fn test_docker_daemon_not_running() {
        let shell = MockShell::new();
        without_native_postgres(&shell);
        shell.fail("docker info", "Cannot connect to the Docker daemon");

        let err = docker(&shell, Arc::new(MemoryEnv::new())).execute().unwrap_err();
        assert!(err.to_string().contains("Docker is not running"));
        assert!(shell.ran("sudo systemctl start docker"));
    }

    #[test]
    fn test_policy_and_description() {
        let cmd = docker(&MockShell::new(), Arc::new(MemoryEnv::new()));
        assert_eq!(cmd.failure_policy(), FailurePolicy::Tolerate);
        assert_eq!(cmd.description(), "Setup Docker containers");
        assert!(cmd.can_execute());
    }
}
