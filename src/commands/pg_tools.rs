//! `bin/pg-tools` wrappers that prefer the database container's binaries
//!
//! Each wrapper runs the tool inside the running database container when
//! there is one and falls back to the host binary otherwise. `pg_dump` gets
//! special handling for `--file`/`-f` since the container cannot write to
//! the host filesystem, and defaults to `-U postgres`.

use super::{Command, CommandContext};
use crate::core::error::CommandResult;
use std::path::Path;
use tracing::info;

const TOOLS: &[&str] = &["pg_dump", "psql"];
const TOOLS_DIR: &str = "bin/pg-tools";
const ENVRC_LINE: &str = "PATH_add bin/pg-tools";

const GENERIC_WRAPPER: &str = r#"#!/usr/bin/env bash
set -e

CONTAINER="@CONTAINER@"

if docker ps --format '{{.Names}}' 2>/dev/null | grep -q "^${CONTAINER}$"; then
  echo "Using @TOOL@ from Docker container: $CONTAINER" >&2
  exec docker exec -i "$CONTAINER" @TOOL@ "$@"
fi

exec @TOOL@ "$@"
"#;

const PG_DUMP_WRAPPER: &str = r#"#!/usr/bin/env bash
set -e

CONTAINER="@CONTAINER@"

if docker ps --format '{{.Names}}' 2>/dev/null | grep -q "^${CONTAINER}$"; then
  echo "Using pg_dump from Docker container: $CONTAINER" >&2

  OUTPUT_FILE=""
  HAS_USER=""
  ARGS=()
  while [[ $# -gt 0 ]]; do
    case $1 in
      --file|-f)
        OUTPUT_FILE="$2"
        shift 2
        ;;
      --file=*)
        OUTPUT_FILE="${1#*=}"
        shift
        ;;
      -U|--username|--username=*)
        HAS_USER="1"
        ARGS+=("$1")
        shift
        ;;
      *)
        ARGS+=("$1")
        shift
        ;;
    esac
  done

  if [[ -z "$HAS_USER" ]]; then
    ARGS=("-U" "postgres" "${ARGS[@]}")
  fi

  if [[ -n "$OUTPUT_FILE" ]]; then
    docker exec -i "$CONTAINER" pg_dump "${ARGS[@]}" > "$OUTPUT_FILE"
    exit 0
  fi
  exec docker exec -i "$CONTAINER" pg_dump "${ARGS[@]}"
fi

exec pg_dump "$@"
"#;

pub struct PgToolsCommand {
    ctx: CommandContext,
}

impl PgToolsCommand {
    pub fn new(ctx: CommandContext) -> Self {
        Self { ctx }
    }

    pub fn boxed(ctx: &CommandContext) -> Box<dyn Command> {
        Box::new(Self::new(ctx.clone()))
    }

    /// Wrapper script for `tool` targeting `container`
    pub fn wrapper(tool: &str, container: &str) -> String {
        let template = if tool == "pg_dump" { PG_DUMP_WRAPPER } else { GENERIC_WRAPPER };
        template
            .replace("@CONTAINER@", container)
            .replace("@TOOL@", tool)
    }

    fn write_wrapper(&self, tool: &str) -> CommandResult {
        let path = self.ctx.path(TOOLS_DIR).join(tool);
        std::fs::write(&path, Self::wrapper(tool, &self.ctx.config.database.name))?;
        make_executable(&path)?;
        info!("Created {}/{}", TOOLS_DIR, tool);
        Ok(())
    }

    fn ensure_envrc(&self) -> CommandResult {
        let envrc = self.ctx.path(".envrc");
        if !envrc.exists() {
            std::fs::write(&envrc, format!("{}\n", ENVRC_LINE))?;
            info!("Created .envrc (run 'direnv allow' to enable for shell access)");
            return Ok(());
        }
        if !std::fs::read_to_string(&envrc)?.contains(TOOLS_DIR) {
            info!("Note: add '{}' to your existing .envrc for shell access", ENVRC_LINE);
        }
        Ok(())
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

impl Command for PgToolsCommand {
    fn name(&self) -> &str {
        "pg_tools"
    }

    fn description(&self) -> String {
        "Setting up PostgreSQL tools wrappers".to_string()
    }

    fn can_execute(&self) -> bool {
        !self.ctx.config.database.name.trim().is_empty()
    }

    fn execute(&mut self) -> CommandResult {
        std::fs::create_dir_all(self.ctx.path(TOOLS_DIR))?;
        for tool in TOOLS {
            self.write_wrapper(tool)?;
        }
        self.ensure_envrc()
    }
}
