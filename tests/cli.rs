mod common;

use assert_cmd::Command;
use common::{SAMPLE, TestWorkspace, fixture_path};
use predicates::prelude::*;
use predicates::str::contains;

fn dashboard() -> Command {
    let mut cmd = Command::cargo_bin("trade-dashboard").expect("binary exists");
    cmd.env_remove("RUST_LOG");
    cmd
}

fn sample_arg() -> String {
    fixture_path(SAMPLE).to_str().expect("utf-8 path").to_string()
}

#[test]
fn view_renders_partner_rankings() {
    dashboard()
        .args(["view", "--csv", &sample_arg(), "--analysis", "counterparties", "--top", "2"])
        .assert()
        .success()
        .stdout(contains("Trading partner analysis"))
        .stdout(contains("Top 2 trading partners by import"))
        .stdout(contains("Top 2 trading partners by trade balance"))
        .stdout(contains("17,500"))
        .stdout(contains("-6,500"))
        .stdout(contains("Filters: no filters | Rows: 7"));
}

#[test]
fn overview_includes_yearly_trend() {
    dashboard()
        .args(["view", "--csv", &sample_arg()])
        .assert()
        .success()
        .stdout(contains("Trade overview"))
        .stdout(contains("Yearly import and export trend"))
        .stdout(contains("7,900.50"));
}

#[test]
fn view_applies_filters() {
    dashboard()
        .args(["view", "--csv", &sample_arg(), "--year", "2565", "--analysis", "items"])
        .assert()
        .success()
        .stdout(contains("year contains '2565'"))
        .stdout(contains("Rows: 4"))
        .stdout(contains("ยางแผ่นรมควัน"));
}

#[test]
fn view_emits_json_report() {
    let output = dashboard()
        .args([
            "view",
            "--csv",
            &sample_arg(),
            "--analysis",
            "counterparties",
            "--format",
            "json",
        ])
        .output()
        .expect("run view");
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json report");
    assert_eq!(report["view"], "counterparties");
    assert_eq!(report["row_count"], 7);
    let panels = report["panels"].as_array().expect("panels");
    assert_eq!(panels.len(), 3);
    assert_eq!(panels[0]["kind"], "ranking");
    assert_eq!(panels[0]["metric"], "import");
    assert_eq!(panels[0]["rows"][0]["key"], "จีน");
    assert_eq!(panels[2]["kind"], "balance");
    assert_eq!(panels[2]["rows"][0]["key"], "ญี่ปุ่น");
}

#[test]
fn no_matching_rows_is_not_an_error() {
    dashboard()
        .args(["view", "--csv", &sample_arg(), "--country", "atlantis"])
        .assert()
        .success()
        .stdout(contains("Rows: 0"))
        .stderr(contains("No rows match the selected filters"));
}

#[test]
fn missing_source_reports_diagnostics_and_exits_cleanly() {
    let workspace = TestWorkspace::new();
    let missing = workspace.path().join("absent.csv");
    dashboard()
        .args(["view", "--csv", missing.to_str().expect("utf-8 path")])
        .assert()
        .success()
        .stderr(contains("Failed to load data"))
        .stderr(contains("No data available"));
}

#[test]
fn rows_exports_filtered_csv() {
    dashboard()
        .args(["rows", "--csv", &sample_arg(), "--country", "จีน", "--csv-out"])
        .assert()
        .success()
        .stdout(contains("\"ชื่อประเทศ\""))
        .stdout(contains("\"คอมพิวเตอร์พกพา\""))
        .stdout(contains("ญี่ปุ่น").not());
}

#[test]
fn rows_writes_output_file_with_limit() {
    let workspace = TestWorkspace::new();
    let out = workspace.path().join("subset.csv");
    dashboard()
        .args([
            "rows",
            "--csv",
            &sample_arg(),
            "--code",
            "1006",
            "--limit",
            "2",
            "-o",
            out.to_str().expect("utf-8 path"),
        ])
        .assert()
        .success();
    let written = std::fs::read_to_string(&out).expect("output file");
    assert_eq!(written.lines().count(), 3);
    assert!(written.lines().all(|line| line.contains("ข้าวขาว") || line.contains("รายการสินค้า")));
}

#[test]
fn columns_lists_headers_and_bindings() {
    dashboard()
        .args(["columns", "--csv", &sample_arg()])
        .assert()
        .success()
        .stdout(contains("ปี พ.ศ."))
        .stdout(contains("customs code"))
        .stdout(contains("หน่วย"));
}

#[test]
fn config_file_renames_columns() {
    let workspace = TestWorkspace::new();
    let data = workspace.write(
        "trade.tsv",
        "Country\tHS\tItem\tYear\tImport\tExport\nJapan\t1006\tRice\t2564\t10\t20\nChina\t8471\tLaptops\t2564\t7\t7\n",
    );
    let config = workspace.write(
        "dashboard.yaml",
        &format!(
            "source:\n  kind: csv_file\n  path: {}\ncolumns:\n  country: Country\n  customs_code: HS\n  item: Item\n  year: Year\n  import: Import\n  export: Export\ntop: 1\n",
            data.display()
        ),
    );
    dashboard()
        .args(["view", "-c", config.to_str().expect("utf-8 path"), "-a", "counterparties"])
        .assert()
        .success()
        .stdout(contains("Top 1 trading partners by import"))
        .stdout(contains("Japan"))
        .stdout(contains("China").not());
}

#[test]
fn invalid_config_fails() {
    let workspace = TestWorkspace::new();
    let config = workspace.write("dashboard.yaml", "top: 0\n");
    dashboard()
        .args(["view", "-c", config.to_str().expect("utf-8 path")])
        .assert()
        .failure()
        .stderr(contains("error:"));
}

#[test]
fn interactive_session_reads_commands_from_stdin() {
    dashboard()
        .args(["interactive", "--csv", &sample_arg()])
        .write_stdin("country เวียดนาม\nview customs-codes\nbogus\nquit\n")
        .assert()
        .success()
        .stdout(contains("Type 'help' for commands."))
        .stdout(contains("country contains 'เวียดนาม'"))
        .stdout(contains("Customs code analysis"))
        .stdout(contains("Unknown command 'bogus'"));
}

#[test]
fn interactive_rejects_data_on_stdin() {
    dashboard()
        .args(["interactive", "--csv", "-"])
        .write_stdin("country,import,export\nJapan,1,2\n")
        .timeout(std::time::Duration::from_secs(10))
        .assert()
        .failure()
        .stderr(contains("reads commands from stdin"));
}
