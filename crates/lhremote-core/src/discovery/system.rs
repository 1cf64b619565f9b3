use super::ProcessInspector;
use crate::{Error, Result};
use async_trait::async_trait;
use sysinfo::{Pid, ProcessesToUpdate, System};
use tokio::process::Command;

/// Process inspection backed by `sysinfo` and the platform socket tools
/// (`lsof` on Unix, `netstat` on Windows)
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProcessInspector;

#[async_trait]
impl ProcessInspector for SystemProcessInspector {
    async fn listening_pid(&self, port: u16) -> Result<Option<u32>> {
        #[cfg(unix)]
        {
            let port_filter = format!("-iTCP:{}", port);
            let output = run("lsof", &["-nP", &port_filter, "-sTCP:LISTEN", "-t"]).await?;
            Ok(parse_lsof_pids(&output).into_iter().next())
        }

        #[cfg(windows)]
        {
            let output = run("netstat", &["-ano", "-p", "TCP"]).await?;
            Ok(parse_netstat_listeners(&output)
                .into_iter()
                .find(|(listening_port, _)| *listening_port == port)
                .map(|(_, pid)| pid))
        }

        #[cfg(not(any(unix, windows)))]
        {
            let _ = port;
            Ok(None)
        }
    }

    async fn child_pids(&self, parent_pid: u32) -> Result<Vec<u32>> {
        tokio::task::spawn_blocking(move || {
            let mut system = System::new();
            system.refresh_processes(ProcessesToUpdate::All, true);

            let parent = Pid::from_u32(parent_pid);
            let mut children: Vec<u32> = system
                .processes()
                .iter()
                .filter(|(_, process)| process.parent() == Some(parent))
                .map(|(pid, _)| pid.as_u32())
                .collect();
            children.sort_unstable();
            children
        })
        .await
        .map_err(|e| Error::Io(std::io::Error::other(e)))
    }

    async fn listening_ports(&self, pid: u32) -> Result<Vec<u16>> {
        #[cfg(unix)]
        {
            let pid_filter = pid.to_string();
            let output = run(
                "lsof",
                &["-nP", "-iTCP", "-sTCP:LISTEN", "-a", "-p", &pid_filter, "-Fn"],
            )
            .await?;
            Ok(parse_lsof_ports(&output))
        }

        #[cfg(windows)]
        {
            let output = run("netstat", &["-ano", "-p", "TCP"]).await?;
            let mut ports: Vec<u16> = parse_netstat_listeners(&output)
                .into_iter()
                .filter(|(_, owner)| *owner == pid)
                .map(|(port, _)| port)
                .collect();
            ports.sort_unstable();
            ports.dedup();
            Ok(ports)
        }

        #[cfg(not(any(unix, windows)))]
        {
            let _ = pid;
            Ok(Vec::new())
        }
    }

    async fn kill(&self, pid: u32) -> Result<()> {
        tokio::task::spawn_blocking(move || {
            let target = Pid::from_u32(pid);
            let mut system = System::new();
            system.refresh_processes(ProcessesToUpdate::Some(&[target]), true);

            match system.process(target) {
                Some(process) if !process.kill() => Err(Error::Io(std::io::Error::other(
                    format!("failed to send kill signal to {}", pid),
                ))),
                Some(_) => Ok(()),
                None => {
                    tracing::debug!(pid, "Process already gone");
                    Ok(())
                }
            }
        })
        .await
        .map_err(|e| Error::Io(std::io::Error::other(e)))?
    }
}

/// Run a tool and return its stdout.
///
/// A non-zero exit with empty stdout is "nothing found" (lsof exits 1 when no
/// socket matches), not an error.
async fn run(program: &str, args: &[&str]) -> Result<String> {
    let output = Command::new(program).args(args).output().await?;
    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();

    if !output.status.success() && !stdout.trim().is_empty() {
        tracing::debug!(
            program,
            status = ?output.status,
            "Tool exited with failure but produced output"
        );
    }
    Ok(stdout)
}

/// Parse `lsof -t` output: one pid per line
pub(crate) fn parse_lsof_pids(output: &str) -> Vec<u32> {
    output
        .lines()
        .filter_map(|line| line.trim().parse().ok())
        .collect()
}

/// Parse `lsof -Fn` output. Name lines look like `n*:9223`,
/// `n127.0.0.1:9223` or `n[::1]:9223`.
pub(crate) fn parse_lsof_ports(output: &str) -> Vec<u16> {
    let mut ports: Vec<u16> = output
        .lines()
        .filter_map(|line| line.strip_prefix('n'))
        .filter_map(|name| {
            let local = name.split("->").next().unwrap_or(name);
            local.rsplit(':').next()?.trim().parse().ok()
        })
        .collect();
    ports.sort_unstable();
    ports.dedup();
    ports
}

/// Parse `netstat -ano` output into `(port, pid)` pairs of listening sockets
#[cfg_attr(not(windows), allow(dead_code))]
pub(crate) fn parse_netstat_listeners(output: &str) -> Vec<(u16, u32)> {
    output
        .lines()
        .filter_map(|line| {
            let columns: Vec<&str> = line.split_whitespace().collect();
            match columns.as_slice() {
                [proto, local, _, state, pid]
                    if proto.eq_ignore_ascii_case("TCP") && *state == "LISTENING" =>
                {
                    let port = local.rsplit(':').next()?.parse().ok()?;
                    let pid = pid.parse().ok()?;
                    Some((port, pid))
                }
                _ => None,
            }
        })
        .collect()
}
