//! Record builders shared by unit tests

use localup_inspect_proto::CapturedRecord;
use serde_json::json;

pub(crate) fn record_json(id: &str, uri: &str, status: Option<u16>) -> serde_json::Value {
    let response = status.map(|code| {
        json!({
            "status": format!("{} Status", code),
            "status_code": code,
            "proto": "HTTP/1.1",
            "headers": {"Content-Type": ["application/json"]},
            "raw": null
        })
    });

    json!({
        "uri": format!("/api/requests/http/{}", id),
        "id": id,
        "tunnel_name": "command_line",
        "remote_addr": "192.168.100.25",
        "start": "2024-01-15T10:30:00+01:00",
        "duration": 12_000_000u64,
        "request": {
            "method": "GET",
            "proto": "HTTP/1.1",
            "headers": {"Host": ["abc.tunnel.io"]},
            "uri": uri,
            "raw": null
        },
        "response": response
    })
}

pub(crate) fn record(id: &str, uri: &str, status: Option<u16>) -> CapturedRecord {
    CapturedRecord::from_value(record_json(id, uri, status)).unwrap()
}

