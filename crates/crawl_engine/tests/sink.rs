use std::fs;

use crawl_engine::{FetchResult, ResultHandler, ResultSink, SinkResultHandler};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

#[test]
fn appending_twice_writes_two_identical_lines() {
    let temp = TempDir::new().unwrap();
    let sink = ResultSink::new(temp.path().join("results.txt"));

    sink.append("http://a\t200\tOK").unwrap();
    sink.append("http://a\t200\tOK").unwrap();

    let content = fs::read_to_string(sink.path()).unwrap();
    assert_eq!(content, "http://a\t200\tOK\nhttp://a\t200\tOK\n");
}

#[test]
fn missing_parent_directory_is_created() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("out").join("nested").join("results.txt");
    let sink = ResultSink::new(&path);

    sink.append("line").unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "line\n");
}

#[test]
fn parent_that_is_a_file_is_an_error() {
    let temp = TempDir::new().unwrap();
    let blocker = temp.path().join("not_a_dir");
    fs::write(&blocker, "x").unwrap();

    let sink = ResultSink::new(blocker.join("results.txt"));
    assert!(sink.append("line").is_err());
}

#[tokio::test]
async fn default_result_handler_appends_the_display_form() {
    let temp = TempDir::new().unwrap();
    let handler = SinkResultHandler::new(ResultSink::new(temp.path().join("results.txt")));
    let result = FetchResult::new("http://a", 503, "Service Unavailable").with_text("down");

    handler.handle(&result).await.unwrap();
    handler.handle(&result).await.unwrap();

    let line = r#"{"url":"http://a","status":503,"message":"Service Unavailable","text":"down"}"#;
    let content = fs::read_to_string(temp.path().join("results.txt")).unwrap();
    assert_eq!(content, format!("{line}\n{line}\n"));
}

#[tokio::test]
async fn body_with_newlines_stays_on_one_line() {
    let temp = TempDir::new().unwrap();
    let handler = SinkResultHandler::new(ResultSink::new(temp.path().join("results.txt")));
    let body = "<html>\n\t<p>two\nlines</p>\n</html>";
    let result = FetchResult::new("http://a", 200, "OK").with_text(body);

    handler.handle(&result).await.unwrap();

    let content = fs::read_to_string(temp.path().join("results.txt")).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 1);
    let record: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(record["url"], "http://a");
    assert_eq!(record["status"], 200);
    assert_eq!(record["text"], body);
}

#[test]
fn record_without_text_serializes_null() {
    let result = FetchResult::new("job-1", 0, "queued");
    assert_eq!(
        result.to_string(),
        r#"{"url":"job-1","status":0,"message":"queued","text":null}"#
    );
}
