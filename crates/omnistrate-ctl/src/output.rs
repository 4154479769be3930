//! Output formatting for CLI commands.
//!
//! Supports table (human-readable) and JSON output formats.

use std::io::Write;

use omni_workflow::{ResourceStatus, Verdict, WorkflowReport};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::cli::Format;
use crate::error::CliError;
use crate::mcp::McpServer;
use crate::model::{Instance, Snapshot};

/// Output formatter that handles both table and JSON output.
#[derive(Debug, Clone)]
pub struct OutputFormat {
    format: Format,
}

impl OutputFormat {
    /// Create a new output formatter.
    #[must_use]
    pub const fn new(format: Format) -> Self {
        Self { format }
    }

    /// Get the current format.
    #[must_use]
    pub const fn format(&self) -> Format {
        self.format
    }

    /// Check if JSON format is selected.
    #[must_use]
    pub const fn is_json(&self) -> bool {
        matches!(self.format, Format::Json)
    }

    /// Write a serializable value to the output.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write<W, T>(&self, writer: &mut W, value: &T) -> Result<(), CliError>
    where
        W: Write,
        T: Serialize + TableDisplay,
    {
        match self.format {
            Format::Json => {
                serde_json::to_writer_pretty(&mut *writer, value)
                    .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")))?;
                writeln!(writer)?;
            }
            Format::Table => {
                value.write_table(writer)?;
            }
        }
        Ok(())
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::new(Format::Table)
    }
}

/// Trait for types that can be displayed as a table.
pub trait TableDisplay {
    /// Write the value as a human-readable table.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError>;
}

/// Instances in a service environment.
#[derive(Debug, Clone, Serialize)]
pub struct InstanceList {
    /// Instances.
    pub instances: Vec<Instance>,
}

impl TableDisplay for InstanceList {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.instances.is_empty() {
            writeln!(writer, "No instances found")?;
            return Ok(());
        }

        writeln!(
            writer,
            "{:<24}  {:<12}  {:<8}  {:<14}  {:<20}",
            "ID", "STATUS", "CLOUD", "REGION", "CREATED"
        )?;
        writeln!(writer, "{}", "─".repeat(86))?;

        for instance in &self.instances {
            writeln!(
                writer,
                "{:<24}  {:<12}  {:<8}  {:<14}  {:<20}",
                truncate(&instance.id, 24),
                truncate(&instance.status, 12),
                instance.cloud_provider.as_deref().unwrap_or("-"),
                instance.region.as_deref().unwrap_or("-"),
                instance.created_at.as_deref().map_or_else(|| "-".into(), |c| truncate(c, 20)),
            )?;
        }

        writeln!(writer)?;
        writeln!(writer, "Total: {} instance(s)", self.instances.len())?;
        Ok(())
    }
}

impl TableDisplay for Instance {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Instance: {}", self.id)?;
        writeln!(writer, "══════════════════════════════════════════════════")?;
        writeln!(writer, "  Status:         {}", self.status)?;
        writeln!(writer, "  Resource:       {}", or_dash(self.resource_id.as_deref()))?;
        writeln!(writer, "  Cloud:          {}", or_dash(self.cloud_provider.as_deref()))?;
        writeln!(writer, "  Region:         {}", or_dash(self.region.as_deref()))?;
        writeln!(writer, "  Plan Version:   {}", or_dash(self.tier_version.as_deref()))?;
        writeln!(writer, "  Created:        {}", or_dash(self.created_at.as_deref()))?;
        write_params(writer, &self.result_params)?;
        Ok(())
    }
}

/// Snapshots of one instance.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotList {
    /// Instance the snapshots belong to.
    pub instance_id: String,
    /// Snapshots.
    pub snapshots: Vec<Snapshot>,
}

impl TableDisplay for SnapshotList {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.snapshots.is_empty() {
            writeln!(writer, "No snapshots for instance {}", self.instance_id)?;
            return Ok(());
        }

        writeln!(
            writer,
            "{:<24}  {:<12}  {:>8}  {:<10}  {:<20}",
            "ID", "STATUS", "PROGRESS", "TYPE", "CREATED"
        )?;
        writeln!(writer, "{}", "─".repeat(82))?;

        for snapshot in &self.snapshots {
            writeln!(
                writer,
                "{:<24}  {:<12}  {:>8}  {:<10}  {:<20}",
                truncate(&snapshot.snapshot_id, 24),
                truncate(&snapshot.status, 12),
                snapshot
                    .progress
                    .map_or_else(|| "-".into(), |p| format!("{p}%")),
                snapshot.snapshot_type.as_deref().unwrap_or("-"),
                snapshot.created_time.as_deref().map_or_else(|| "-".into(), |c| truncate(c, 20)),
            )?;
        }

        writeln!(writer)?;
        writeln!(writer, "Total: {} snapshot(s)", self.snapshots.len())?;
        Ok(())
    }
}

impl TableDisplay for Snapshot {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Snapshot: {}", self.snapshot_id)?;
        writeln!(writer, "══════════════════════════════════════════════════")?;
        writeln!(writer, "  Status:         {}", self.status)?;
        if let Some(progress) = self.progress {
            writeln!(writer, "  Progress:       {progress}%")?;
        }
        writeln!(writer, "  Type:           {}", or_dash(self.snapshot_type.as_deref()))?;
        writeln!(writer, "  Region:         {}", or_dash(self.region.as_deref()))?;
        writeln!(writer, "  Source:         {}", or_dash(self.source_instance_id.as_deref()))?;
        writeln!(writer, "  Created:        {}", or_dash(self.created_time.as_deref()))?;
        writeln!(writer, "  Completed:      {}", or_dash(self.completed_time.as_deref()))?;
        Ok(())
    }
}

/// Final outcome of a followed deployment workflow.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowSummary {
    /// Instance the workflow ran for.
    pub instance_id: String,
    /// Action that was followed.
    pub action: String,
    /// Poller report.
    #[serde(flatten)]
    pub report: WorkflowReport,
}

impl TableDisplay for WorkflowSummary {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        let Some(status) = &self.report.workflow_status else {
            writeln!(
                writer,
                "No {} workflow found for instance {}",
                self.action, self.instance_id
            )?;
            return Ok(());
        };

        match self.report.verdict {
            Verdict::Success => writeln!(
                writer,
                "✓ {} of {} finished: {status}",
                self.action, self.instance_id
            )?,
            Verdict::Failure => writeln!(
                writer,
                "✗ {} of {} finished: {status}",
                self.action, self.instance_id
            )?,
        }

        for resource in &self.report.resources {
            let icon = match resource.status {
                ResourceStatus::Completed => "✓",
                ResourceStatus::Failed => "✗",
                ResourceStatus::Running | ResourceStatus::Pending => "○",
            };
            writeln!(writer, "  {icon} {:<24} {}", resource.name, resource.status)?;
        }
        Ok(())
    }
}

/// Simple message output.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    /// Message text.
    pub message: String,
    /// Whether this is a success message.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub success: bool,
    /// Identifier the operation produced, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl Message {
    /// Create a success message.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            success: true,
            id: None,
        }
    }

    /// Create an informational message.
    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            success: false,
            id: None,
        }
    }

    /// Attach the identifier the operation produced.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

impl TableDisplay for Message {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.success {
            writeln!(writer, "✓ {}", self.message)?;
        } else {
            writeln!(writer, "{}", self.message)?;
        }
        Ok(())
    }
}

/// Configured MCP servers.
#[derive(Debug, Clone, Serialize)]
pub struct McpServerList {
    /// Servers by name, in file order.
    pub servers: Vec<McpServerEntry>,
}

/// One named MCP server.
#[derive(Debug, Clone, Serialize)]
pub struct McpServerEntry {
    /// Server name.
    pub name: String,
    /// Server definition.
    #[serde(flatten)]
    pub server: McpServer,
}

impl TableDisplay for McpServerList {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.servers.is_empty() {
            writeln!(writer, "No MCP servers configured")?;
            return Ok(());
        }

        writeln!(writer, "{:<20}  {:<50}", "NAME", "COMMAND")?;
        writeln!(writer, "{}", "─".repeat(72))?;
        for entry in &self.servers {
            writeln!(
                writer,
                "{:<20}  {:<50}",
                truncate(&entry.name, 20),
                truncate(&entry.server.command_line(), 50)
            )?;
        }
        Ok(())
    }
}

impl TableDisplay for McpServerEntry {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "MCP Server: {}", self.name)?;
        writeln!(writer, "══════════════════════════════════")?;
        writeln!(writer, "  Command:        {}", self.server.command)?;
        if !self.server.args.is_empty() {
            writeln!(writer, "  Args:           {}", self.server.args.join(" "))?;
        }
        if !self.server.env.is_empty() {
            writeln!(writer, "  Environment:")?;
            for (key, value) in &self.server.env {
                writeln!(writer, "    {key}={value}")?;
            }
        }
        Ok(())
    }
}

fn write_params<W: Write>(writer: &mut W, params: &Map<String, Value>) -> Result<(), CliError> {
    if params.is_empty() {
        return Ok(());
    }
    writeln!(writer)?;
    writeln!(writer, "Parameters")?;
    for (key, value) in params {
        match value {
            Value::String(s) => writeln!(writer, "  {key}: {s}")?,
            other => writeln!(writer, "  {key}: {other}")?,
        }
    }
    Ok(())
}

fn or_dash(value: Option<&str>) -> &str {
    value.filter(|v| !v.is_empty()).unwrap_or("-")
}

/// Truncate a string to a maximum number of characters.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len > 3 {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{kept}...")
    } else {
        s.chars().take(max_len).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use omni_workflow::ResourceReport;

    fn render<T: Serialize + TableDisplay>(format: Format, value: &T) -> String {
        let mut buf = Vec::new();
        OutputFormat::new(format)
            .write(&mut buf, value)
            .expect("write");
        String::from_utf8(buf).expect("valid utf8")
    }

    fn instance(id: &str, status: &str) -> Instance {
        Instance {
            id: id.into(),
            status: status.into(),
            cloud_provider: Some("aws".into()),
            region: Some("us-east-2".into()),
            ..Instance::default()
        }
    }

    #[test]
    fn output_format_default_is_table() {
        let fmt = OutputFormat::default();
        assert_eq!(fmt.format(), Format::Table);
        assert!(!fmt.is_json());
    }

    #[test]
    fn instance_list_empty() {
        let out = render(Format::Table, &InstanceList { instances: vec![] });
        assert_eq!(out, "No instances found\n");
    }

    #[test]
    fn instance_list_table() {
        let list = InstanceList {
            instances: vec![instance("instance-1", "RUNNING"), instance("instance-2", "FAILED")],
        };
        let out = render(Format::Table, &list);
        assert!(out.contains("STATUS"));
        assert!(out.contains("instance-2"));
        assert!(out.contains("us-east-2"));
        assert!(out.contains("Total: 2 instance(s)"));
    }

    #[test]
    fn instance_json_uses_camel_case() {
        let out = render(Format::Json, &instance("instance-1", "RUNNING"));
        assert!(out.contains("\"cloudProvider\": \"aws\""));
        assert!(!out.contains("resultParams"));
    }

    #[test]
    fn instance_detail_lists_params() {
        let mut detail = instance("instance-1", "RUNNING");
        detail
            .result_params
            .insert("replicas".into(), Value::from(3));
        let out = render(Format::Table, &detail);
        assert!(out.contains("Instance: instance-1"));
        assert!(out.contains("replicas: 3"));
        assert!(out.contains("Resource:       -"));
    }

    #[test]
    fn snapshot_list_shows_progress() {
        let list = SnapshotList {
            instance_id: "instance-1".into(),
            snapshots: vec![Snapshot {
                snapshot_id: "snap-1".into(),
                status: "IN_PROGRESS".into(),
                progress: Some(40),
                ..Snapshot::default()
            }],
        };
        let out = render(Format::Table, &list);
        assert!(out.contains("40%"));
        assert!(out.contains("Total: 1 snapshot(s)"));
    }

    #[test]
    fn workflow_summary_lists_resources() {
        let summary = WorkflowSummary {
            instance_id: "instance-1".into(),
            action: "create".into(),
            report: WorkflowReport {
                workflow_status: Some("success".into()),
                verdict: Verdict::Success,
                polls: 4,
                resources: vec![ResourceReport {
                    key: "r-1".into(),
                    name: "writer".into(),
                    status: ResourceStatus::Completed,
                }],
            },
        };
        let table = render(Format::Table, &summary);
        assert!(table.starts_with("✓ create of instance-1 finished: success"));
        assert!(table.contains("writer"));

        let json = render(Format::Json, &summary);
        assert!(json.contains("\"polls\": 4"));
        assert!(json.contains("\"verdict\": \"success\""));
    }

    #[test]
    fn workflow_summary_without_workflow() {
        let summary = WorkflowSummary {
            instance_id: "instance-1".into(),
            action: "restart".into(),
            report: WorkflowReport {
                workflow_status: None,
                verdict: Verdict::Success,
                polls: 1,
                resources: vec![],
            },
        };
        let out = render(Format::Table, &summary);
        assert_eq!(out, "No restart workflow found for instance instance-1\n");
    }

    #[test]
    fn message_success() {
        let out = render(Format::Table, &Message::success("Instance deleted"));
        assert_eq!(out, "✓ Instance deleted\n");
    }

    #[test]
    fn message_json_carries_id() {
        let out = render(Format::Json, &Message::success("Snapshot created").with_id("snap-9"));
        assert!(out.contains("\"id\": \"snap-9\""));
        assert!(out.contains("\"success\": true"));

        let info = render(Format::Json, &Message::info("nothing to do"));
        assert!(!info.contains("success"));
    }

    #[test]
    fn truncate_short_string() {
        assert_eq!(truncate("hello", 10), "hello");
    }

    #[test]
    fn truncate_long_string() {
        assert_eq!(truncate("hello world", 8), "hello...");
    }

    #[test]
    fn truncate_counts_characters() {
        assert_eq!(truncate("✓✓✓✓✓✓", 5), "✓✓...");
        assert_eq!(truncate("hello", 3), "hel");
    }
}
