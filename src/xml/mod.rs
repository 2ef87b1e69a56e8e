//! XML parsing and rendering for store API bodies.
//!
//! Parsers walk the response body with quick-xml's event reader; builders
//! render the small request bodies the write operations need.

use crate::error::{map_service_code, ErrorResponse, ResponseError, StoreError};
use crate::types::*;
use chrono::{DateTime, Utc};
use quick_xml::events::Event;
use quick_xml::Reader;

fn xml_error(e: quick_xml::Error) -> StoreError {
    StoreError::Response(ResponseError::XmlParse {
        message: e.to_string(),
    })
}

fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Name of the document's root element, if the body parses at all.
fn root_element(xml: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return Some(String::from_utf8_lossy(e.name().as_ref()).to_string());
            }
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
    }
}

/// Parse a service error response body.
pub fn parse_error_response(xml: &str) -> Result<ErrorResponse, StoreError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut code = String::new();
    let mut message = String::new();
    let mut bucket = None;
    let mut key = None;
    let mut request_id = None;
    let mut host_id = None;
    let mut current_element = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                current_element = String::from_utf8_lossy(e.name().as_ref()).to_string();
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape().unwrap_or_default().to_string();
                match current_element.as_str() {
                    "Code" => code = text,
                    "Message" => message = text,
                    "BucketName" | "Bucket" => bucket = Some(text),
                    "Key" => key = Some(text),
                    "RequestId" => request_id = Some(text),
                    "HostId" => host_id = Some(text),
                    _ => {}
                }
            }
            Ok(Event::End(_)) => {
                current_element.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
    }

    Ok(ErrorResponse {
        code,
        message,
        bucket,
        key,
        request_id,
        host_id,
    })
}

/// Parse a ListBucketResult body, V1 or V2.
///
/// The two listing API versions share the envelope; they differ only in
/// the pagination fields, so both land in the same page type.
pub fn parse_list_objects(xml: &str) -> Result<ListObjectsPage, StoreError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut page = ListObjectsPage::default();

    let mut current_object: Option<ObjectSummary> = None;
    let mut current_owner: Option<Owner> = None;
    let mut in_contents = false;
    let mut in_owner = false;
    let mut in_common_prefixes = false;
    let mut current_element = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                current_element = name.clone();

                match name.as_str() {
                    "Contents" => {
                        in_contents = true;
                        current_object = Some(ObjectSummary {
                            key: String::new(),
                            size: 0,
                            e_tag: None,
                            last_modified: None,
                            owner: None,
                            is_prefix: false,
                        });
                    }
                    "Owner" if in_contents => {
                        in_owner = true;
                        current_owner = Some(Owner {
                            id: None,
                            display_name: None,
                        });
                    }
                    "CommonPrefixes" => {
                        in_common_prefixes = true;
                    }
                    _ => {}
                }
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape().unwrap_or_default().to_string();

                if in_contents {
                    if in_owner {
                        if let Some(owner) = current_owner.as_mut() {
                            match current_element.as_str() {
                                "ID" => owner.id = Some(text),
                                "DisplayName" => owner.display_name = Some(text),
                                _ => {}
                            }
                        }
                    } else if let Some(obj) = current_object.as_mut() {
                        match current_element.as_str() {
                            "Key" => obj.key = text,
                            "LastModified" => obj.last_modified = parse_timestamp(&text),
                            "ETag" => obj.e_tag = Some(text),
                            "Size" => obj.size = text.parse().unwrap_or(0),
                            _ => {}
                        }
                    }
                } else if in_common_prefixes {
                    if current_element == "Prefix" {
                        page.common_prefixes.push(text);
                    }
                } else {
                    match current_element.as_str() {
                        "IsTruncated" => page.is_truncated = text == "true",
                        "NextContinuationToken" => page.next_continuation_token = Some(text),
                        "NextMarker" => page.next_marker = Some(text),
                        _ => {}
                    }
                }
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                match name.as_str() {
                    "Contents" => {
                        if let Some(mut obj) = current_object.take() {
                            obj.owner = current_owner.take();
                            page.objects.push(obj);
                        }
                        in_contents = false;
                    }
                    "Owner" if in_contents => {
                        in_owner = false;
                    }
                    "CommonPrefixes" => {
                        in_common_prefixes = false;
                    }
                    _ => {}
                }
                current_element.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
    }

    Ok(page)
}

/// Parse a ListAllMyBucketsResult body.
pub fn parse_list_buckets(xml: &str) -> Result<Vec<BucketInfo>, StoreError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut buckets = Vec::new();
    let mut current_bucket: Option<BucketInfo> = None;
    let mut in_bucket = false;
    let mut current_element = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                current_element = name.clone();

                if name == "Bucket" {
                    in_bucket = true;
                    current_bucket = Some(BucketInfo {
                        name: String::new(),
                        creation_date: None,
                    });
                }
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape().unwrap_or_default().to_string();

                if in_bucket {
                    if let Some(bucket) = current_bucket.as_mut() {
                        match current_element.as_str() {
                            "Name" => bucket.name = text,
                            "CreationDate" => bucket.creation_date = parse_timestamp(&text),
                            _ => {}
                        }
                    }
                }
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if name == "Bucket" {
                    if let Some(bucket) = current_bucket.take() {
                        buckets.push(bucket);
                    }
                    in_bucket = false;
                }
                current_element.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
    }

    Ok(buckets)
}

/// Parse an InitiateMultipartUploadResult body.
pub fn parse_create_multipart_upload(xml: &str) -> Result<CreatedUpload, StoreError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut bucket = String::new();
    let mut key = String::new();
    let mut upload_id = String::new();
    let mut current_element = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                current_element = String::from_utf8_lossy(e.name().as_ref()).to_string();
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape().unwrap_or_default().to_string();
                match current_element.as_str() {
                    "Bucket" => bucket = text,
                    "Key" => key = text,
                    "UploadId" => upload_id = text,
                    _ => {}
                }
            }
            Ok(Event::End(_)) => {
                current_element.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
    }

    Ok(CreatedUpload {
        bucket,
        key,
        upload_id,
        request_id: None,
    })
}

/// Parse a CompleteMultipartUploadResult body.
///
/// Completion can fail after the service has already sent a 200 status;
/// the failure then arrives as an Error document in the body, which this
/// parser surfaces as the mapped error.
pub fn parse_complete_multipart_upload(xml: &str) -> Result<CompletedUpload, StoreError> {
    if root_element(xml).as_deref() == Some("Error") {
        let response = parse_error_response(xml)?;
        let code = response.code.clone();
        return Err(map_service_code(&code, Some(response)));
    }

    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut output = CompletedUpload {
        bucket: String::new(),
        key: String::new(),
        e_tag: None,
        location: None,
        request_id: None,
    };
    let mut current_element = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                current_element = String::from_utf8_lossy(e.name().as_ref()).to_string();
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape().unwrap_or_default().to_string();
                match current_element.as_str() {
                    "Bucket" => output.bucket = text,
                    "Key" => output.key = text,
                    "ETag" => output.e_tag = Some(text),
                    "Location" => output.location = Some(text),
                    _ => {}
                }
            }
            Ok(Event::End(_)) => {
                current_element.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
    }

    Ok(output)
}

/// Parse a CopyObjectResult body.
///
/// Like completion, a copy can fail after the 200 status line; an Error
/// document in the body is surfaced as the mapped error.
pub fn parse_copy_object(xml: &str) -> Result<CopyObjectResult, StoreError> {
    if root_element(xml).as_deref() == Some("Error") {
        let response = parse_error_response(xml)?;
        let code = response.code.clone();
        return Err(map_service_code(&code, Some(response)));
    }

    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut output = CopyObjectResult {
        e_tag: None,
        last_modified: None,
    };
    let mut current_element = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                current_element = String::from_utf8_lossy(e.name().as_ref()).to_string();
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape().unwrap_or_default().to_string();
                match current_element.as_str() {
                    "ETag" => output.e_tag = Some(text),
                    "LastModified" => output.last_modified = parse_timestamp(&text),
                    _ => {}
                }
            }
            Ok(Event::End(_)) => {
                current_element.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
    }

    Ok(output)
}

/// Parse a ListPartsResult body.
pub fn parse_list_parts(xml: &str) -> Result<ListPartsPage, StoreError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut page = ListPartsPage::default();
    let mut current_part: Option<PartInfo> = None;
    let mut in_part = false;
    let mut current_element = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                current_element = name.clone();

                if name == "Part" {
                    in_part = true;
                    current_part = Some(PartInfo {
                        part_number: 0,
                        e_tag: String::new(),
                        size: None,
                        last_modified: None,
                    });
                }
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape().unwrap_or_default().to_string();

                if in_part {
                    if let Some(part) = current_part.as_mut() {
                        match current_element.as_str() {
                            "PartNumber" => part.part_number = text.parse().unwrap_or(0),
                            "ETag" => part.e_tag = text,
                            "Size" => part.size = text.parse().ok(),
                            "LastModified" => part.last_modified = parse_timestamp(&text),
                            _ => {}
                        }
                    }
                } else {
                    match current_element.as_str() {
                        "NextPartNumberMarker" => {
                            page.next_part_number_marker = text.parse().ok()
                        }
                        "IsTruncated" => page.is_truncated = text == "true",
                        _ => {}
                    }
                }
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if name == "Part" {
                    if let Some(part) = current_part.take() {
                        page.parts.push(part);
                    }
                    in_part = false;
                }
                current_element.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
    }

    Ok(page)
}

/// Parse a ListMultipartUploadsResult body.
pub fn parse_list_multipart_uploads(xml: &str) -> Result<ListUploadsPage, StoreError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut page = ListUploadsPage::default();

    let mut current_upload: Option<MultipartUploadInfo> = None;
    let mut current_owner: Option<Owner> = None;
    let mut current_initiator: Option<Owner> = None;
    let mut in_upload = false;
    let mut in_owner = false;
    let mut in_initiator = false;
    let mut in_common_prefixes = false;
    let mut current_element = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                current_element = name.clone();

                match name.as_str() {
                    "Upload" => {
                        in_upload = true;
                        current_upload = Some(MultipartUploadInfo {
                            key: String::new(),
                            upload_id: String::new(),
                            initiated: None,
                            initiator: None,
                            owner: None,
                        });
                    }
                    "Owner" if in_upload => {
                        in_owner = true;
                        current_owner = Some(Owner {
                            id: None,
                            display_name: None,
                        });
                    }
                    "Initiator" if in_upload => {
                        in_initiator = true;
                        current_initiator = Some(Owner {
                            id: None,
                            display_name: None,
                        });
                    }
                    "CommonPrefixes" => {
                        in_common_prefixes = true;
                    }
                    _ => {}
                }
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape().unwrap_or_default().to_string();

                if in_upload {
                    if in_owner {
                        if let Some(owner) = current_owner.as_mut() {
                            match current_element.as_str() {
                                "ID" => owner.id = Some(text),
                                "DisplayName" => owner.display_name = Some(text),
                                _ => {}
                            }
                        }
                    } else if in_initiator {
                        if let Some(initiator) = current_initiator.as_mut() {
                            match current_element.as_str() {
                                "ID" => initiator.id = Some(text),
                                "DisplayName" => initiator.display_name = Some(text),
                                _ => {}
                            }
                        }
                    } else if let Some(upload) = current_upload.as_mut() {
                        match current_element.as_str() {
                            "Key" => upload.key = text,
                            "UploadId" => upload.upload_id = text,
                            "Initiated" => upload.initiated = parse_timestamp(&text),
                            _ => {}
                        }
                    }
                } else if in_common_prefixes {
                    if current_element == "Prefix" {
                        page.common_prefixes.push(text);
                    }
                } else {
                    match current_element.as_str() {
                        "NextKeyMarker" => page.next_key_marker = Some(text),
                        "NextUploadIdMarker" => page.next_upload_id_marker = Some(text),
                        "IsTruncated" => page.is_truncated = text == "true",
                        _ => {}
                    }
                }
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                match name.as_str() {
                    "Upload" => {
                        if let Some(mut upload) = current_upload.take() {
                            upload.owner = current_owner.take();
                            upload.initiator = current_initiator.take();
                            page.uploads.push(upload);
                        }
                        in_upload = false;
                    }
                    "Owner" if in_upload => {
                        in_owner = false;
                    }
                    "Initiator" if in_upload => {
                        in_initiator = false;
                    }
                    "CommonPrefixes" => {
                        in_common_prefixes = false;
                    }
                    _ => {}
                }
                current_element.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
    }

    Ok(page)
}

/// Parse a DeleteResult body into per-key outcomes.
pub fn parse_delete_result(xml: &str) -> Result<Vec<DeleteOutcome>, StoreError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut outcomes = Vec::new();

    #[derive(Default)]
    struct Entry {
        key: String,
        version_id: Option<String>,
        delete_marker: bool,
        code: String,
        message: String,
    }

    let mut current: Option<Entry> = None;
    let mut in_error = false;
    let mut current_element = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                current_element = name.clone();

                match name.as_str() {
                    "Deleted" => {
                        current = Some(Entry::default());
                    }
                    "Error" => {
                        in_error = true;
                        current = Some(Entry::default());
                    }
                    _ => {}
                }
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape().unwrap_or_default().to_string();

                if let Some(entry) = current.as_mut() {
                    match current_element.as_str() {
                        "Key" => entry.key = text,
                        "VersionId" => entry.version_id = Some(text),
                        "DeleteMarker" => entry.delete_marker = text == "true",
                        "Code" => entry.code = text,
                        "Message" => entry.message = text,
                        _ => {}
                    }
                }
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                match name.as_str() {
                    "Deleted" => {
                        if let Some(entry) = current.take() {
                            outcomes.push(DeleteOutcome::Removed {
                                key: entry.key,
                                version_id: entry.version_id,
                                delete_marker: entry.delete_marker,
                            });
                        }
                    }
                    "Error" if in_error => {
                        if let Some(entry) = current.take() {
                            outcomes.push(DeleteOutcome::Failed {
                                key: entry.key,
                                code: entry.code,
                                message: entry.message,
                            });
                        }
                        in_error = false;
                    }
                    _ => {}
                }
                current_element.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
    }

    Ok(outcomes)
}

/// Parse a NotificationConfiguration body.
pub fn parse_notification_config(xml: &str) -> Result<NotificationConfig, StoreError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut config = NotificationConfig::new();

    #[derive(Default)]
    struct Entry {
        id: Option<String>,
        arn: String,
        events: Vec<String>,
        prefix_filter: Option<String>,
        suffix_filter: Option<String>,
    }

    let mut current: Option<Entry> = None;
    let mut rule_name = String::new();
    let mut rule_value = String::new();
    let mut in_filter_rule = false;
    let mut current_element = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                current_element = name.clone();

                match name.as_str() {
                    "TopicConfiguration" | "QueueConfiguration" => {
                        current = Some(Entry::default());
                    }
                    "FilterRule" => {
                        in_filter_rule = true;
                        rule_name.clear();
                        rule_value.clear();
                    }
                    _ => {}
                }
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape().unwrap_or_default().to_string();

                if in_filter_rule {
                    match current_element.as_str() {
                        "Name" => rule_name = text,
                        "Value" => rule_value = text,
                        _ => {}
                    }
                } else if let Some(entry) = current.as_mut() {
                    match current_element.as_str() {
                        "Id" => entry.id = Some(text),
                        "Topic" | "Queue" => entry.arn = text,
                        "Event" => entry.events.push(text),
                        _ => {}
                    }
                }
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                match name.as_str() {
                    "FilterRule" => {
                        if let Some(entry) = current.as_mut() {
                            match rule_name.to_lowercase().as_str() {
                                "prefix" => entry.prefix_filter = Some(rule_value.clone()),
                                "suffix" => entry.suffix_filter = Some(rule_value.clone()),
                                _ => {}
                            }
                        }
                        in_filter_rule = false;
                    }
                    "TopicConfiguration" => {
                        if let Some(entry) = current.take() {
                            config.topic_configs.push(TopicConfig {
                                id: entry.id,
                                topic_arn: entry.arn,
                                events: entry.events,
                                prefix_filter: entry.prefix_filter,
                                suffix_filter: entry.suffix_filter,
                            });
                        }
                    }
                    "QueueConfiguration" => {
                        if let Some(entry) = current.take() {
                            config.queue_configs.push(QueueConfig {
                                id: entry.id,
                                queue_arn: entry.arn,
                                events: entry.events,
                                prefix_filter: entry.prefix_filter,
                                suffix_filter: entry.suffix_filter,
                            });
                        }
                    }
                    _ => {}
                }
                current_element.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
    }

    Ok(config)
}

/// Build a Delete request body for batch removal.
pub fn build_delete_objects_xml(keys: &[String], quiet: bool) -> String {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str("<Delete>");

    if quiet {
        xml.push_str("<Quiet>true</Quiet>");
    }

    for key in keys {
        xml.push_str("<Object>");
        xml.push_str(&format!("<Key>{}</Key>", escape_xml(key)));
        xml.push_str("</Object>");
    }

    xml.push_str("</Delete>");
    xml
}

/// Build a CompleteMultipartUpload request body.
///
/// Parts must already be sorted by part number.
pub fn build_complete_multipart_xml(parts: &[CompletedPart]) -> String {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str("<CompleteMultipartUpload>");

    for part in parts {
        xml.push_str("<Part>");
        xml.push_str(&format!("<PartNumber>{}</PartNumber>", part.part_number));
        xml.push_str(&format!("<ETag>{}</ETag>", escape_xml(&part.e_tag)));
        xml.push_str("</Part>");
    }

    xml.push_str("</CompleteMultipartUpload>");
    xml
}

/// Build a CreateBucketConfiguration body (for non-us-east-1 regions).
pub fn build_create_bucket_xml(region: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<CreateBucketConfiguration xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
    <LocationConstraint>{}</LocationConstraint>
</CreateBucketConfiguration>"#,
        escape_xml(region)
    )
}

fn push_filter_rules(
    xml: &mut String,
    prefix_filter: &Option<String>,
    suffix_filter: &Option<String>,
) {
    if prefix_filter.is_none() && suffix_filter.is_none() {
        return;
    }
    xml.push_str("<Filter><S3Key>");
    if let Some(prefix) = prefix_filter {
        xml.push_str(&format!(
            "<FilterRule><Name>prefix</Name><Value>{}</Value></FilterRule>",
            escape_xml(prefix)
        ));
    }
    if let Some(suffix) = suffix_filter {
        xml.push_str(&format!(
            "<FilterRule><Name>suffix</Name><Value>{}</Value></FilterRule>",
            escape_xml(suffix)
        ));
    }
    xml.push_str("</S3Key></Filter>");
}

/// Build a NotificationConfiguration body.
///
/// An empty configuration is valid and clears all subscriptions.
pub fn build_notification_xml(config: &NotificationConfig) -> String {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str(
        "<NotificationConfiguration xmlns=\"http://s3.amazonaws.com/doc/2006-03-01/\">",
    );

    for topic in &config.topic_configs {
        xml.push_str("<TopicConfiguration>");
        if let Some(id) = &topic.id {
            xml.push_str(&format!("<Id>{}</Id>", escape_xml(id)));
        }
        xml.push_str(&format!("<Topic>{}</Topic>", escape_xml(&topic.topic_arn)));
        for event in &topic.events {
            xml.push_str(&format!("<Event>{}</Event>", escape_xml(event)));
        }
        push_filter_rules(&mut xml, &topic.prefix_filter, &topic.suffix_filter);
        xml.push_str("</TopicConfiguration>");
    }

    for queue in &config.queue_configs {
        xml.push_str("<QueueConfiguration>");
        if let Some(id) = &queue.id {
            xml.push_str(&format!("<Id>{}</Id>", escape_xml(id)));
        }
        xml.push_str(&format!("<Queue>{}</Queue>", escape_xml(&queue.queue_arn)));
        for event in &queue.events {
            xml.push_str(&format!("<Event>{}</Event>", escape_xml(event)));
        }
        push_filter_rules(&mut xml, &queue.prefix_filter, &queue.suffix_filter);
        xml.push_str("</QueueConfiguration>");
    }

    xml.push_str("</NotificationConfiguration>");
    xml
}

/// Escape special characters for XML.
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_response() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
        <Error>
            <Code>NoSuchKey</Code>
            <Message>The specified key does not exist.</Message>
            <Key>my-key</Key>
            <RequestId>ABC123</RequestId>
            <HostId>XYZ789</HostId>
        </Error>"#;

        let result = parse_error_response(xml).unwrap();
        assert_eq!(result.code, "NoSuchKey");
        assert_eq!(result.key, Some("my-key".to_string()));
        assert_eq!(result.request_id, Some("ABC123".to_string()));
    }

    #[test]
    fn test_parse_list_objects_v2() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
        <ListBucketResult>
            <Name>mybucket</Name>
            <Prefix>photos/</Prefix>
            <MaxKeys>1000</MaxKeys>
            <IsTruncated>true</IsTruncated>
            <NextContinuationToken>token-1</NextContinuationToken>
            <Contents>
                <Key>photos/1.jpg</Key>
                <LastModified>2023-01-01T00:00:00.000Z</LastModified>
                <ETag>"abc123"</ETag>
                <Size>1024</Size>
            </Contents>
            <Contents>
                <Key>photos/2.jpg</Key>
                <LastModified>2023-01-02T00:00:00.000Z</LastModified>
                <ETag>"def456"</ETag>
                <Size>2048</Size>
            </Contents>
            <CommonPrefixes>
                <Prefix>photos/2023/</Prefix>
            </CommonPrefixes>
        </ListBucketResult>"#;

        let page = parse_list_objects(xml).unwrap();
        assert!(page.is_truncated);
        assert_eq!(page.next_continuation_token, Some("token-1".to_string()));
        assert!(page.next_marker.is_none());
        assert_eq!(page.objects.len(), 2);
        assert_eq!(page.objects[0].key, "photos/1.jpg");
        assert_eq!(page.objects[0].size, 1024);
        assert!(page.objects[0].last_modified.is_some());
        assert_eq!(page.common_prefixes, vec!["photos/2023/".to_string()]);
    }

    #[test]
    fn test_parse_list_objects_v1_markers() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
        <ListBucketResult>
            <Name>mybucket</Name>
            <Marker>photos/0.jpg</Marker>
            <NextMarker>photos/9.jpg</NextMarker>
            <IsTruncated>true</IsTruncated>
            <Contents>
                <Key>photos/5.jpg</Key>
                <Size>10</Size>
            </Contents>
        </ListBucketResult>"#;

        let page = parse_list_objects(xml).unwrap();
        assert!(page.is_truncated);
        assert_eq!(page.next_marker, Some("photos/9.jpg".to_string()));
        assert!(page.next_continuation_token.is_none());
    }

    #[test]
    fn test_parse_list_objects_unescapes_keys() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
        <ListBucketResult>
            <IsTruncated>false</IsTruncated>
            <Contents>
                <Key>docs/a&amp;b.txt</Key>
                <Size>1</Size>
            </Contents>
        </ListBucketResult>"#;

        let page = parse_list_objects(xml).unwrap();
        assert_eq!(page.objects[0].key, "docs/a&b.txt");
    }

    #[test]
    fn test_parse_list_buckets() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
        <ListAllMyBucketsResult>
            <Owner>
                <ID>1234</ID>
                <DisplayName>owner</DisplayName>
            </Owner>
            <Buckets>
                <Bucket>
                    <Name>bucket-one</Name>
                    <CreationDate>2023-06-01T12:00:00.000Z</CreationDate>
                </Bucket>
                <Bucket>
                    <Name>bucket-two</Name>
                    <CreationDate>2023-06-02T12:00:00.000Z</CreationDate>
                </Bucket>
            </Buckets>
        </ListAllMyBucketsResult>"#;

        let buckets = parse_list_buckets(xml).unwrap();
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].name, "bucket-one");
        assert!(buckets[0].creation_date.is_some());
    }

    #[test]
    fn test_parse_create_multipart_upload() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
        <InitiateMultipartUploadResult>
            <Bucket>mybucket</Bucket>
            <Key>mykey</Key>
            <UploadId>upload-123</UploadId>
        </InitiateMultipartUploadResult>"#;

        let result = parse_create_multipart_upload(xml).unwrap();
        assert_eq!(result.bucket, "mybucket");
        assert_eq!(result.key, "mykey");
        assert_eq!(result.upload_id, "upload-123");
    }

    #[test]
    fn test_parse_complete_multipart_upload() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
        <CompleteMultipartUploadResult>
            <Location>https://mybucket.s3.us-east-1.amazonaws.com/mykey</Location>
            <Bucket>mybucket</Bucket>
            <Key>mykey</Key>
            <ETag>"final-etag"</ETag>
        </CompleteMultipartUploadResult>"#;

        let result = parse_complete_multipart_upload(xml).unwrap();
        assert_eq!(result.bucket, "mybucket");
        assert_eq!(result.e_tag, Some("\"final-etag\"".to_string()));
        assert!(result.location.is_some());
    }

    #[test]
    fn test_parse_complete_multipart_error_in_200() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
        <Error>
            <Code>InternalError</Code>
            <Message>We encountered an internal error. Please try again.</Message>
            <RequestId>656c76696e6727732072657175657374</RequestId>
        </Error>"#;

        let result = parse_complete_multipart_upload(xml);
        let error = result.unwrap_err();
        assert_eq!(error.service_code(), Some("InternalError"));
        assert!(error.is_retryable());
    }

    #[test]
    fn test_parse_copy_object() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
        <CopyObjectResult>
            <ETag>"copy-etag"</ETag>
            <LastModified>2023-03-01T10:00:00.000Z</LastModified>
        </CopyObjectResult>"#;

        let result = parse_copy_object(xml).unwrap();
        assert_eq!(result.e_tag, Some("\"copy-etag\"".to_string()));
        assert!(result.last_modified.is_some());
    }

    #[test]
    fn test_parse_list_parts() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
        <ListPartsResult>
            <Bucket>mybucket</Bucket>
            <Key>mykey</Key>
            <UploadId>upload-123</UploadId>
            <IsTruncated>true</IsTruncated>
            <NextPartNumberMarker>2</NextPartNumberMarker>
            <Part>
                <PartNumber>1</PartNumber>
                <ETag>"part-1"</ETag>
                <Size>5242880</Size>
                <LastModified>2023-01-01T00:00:00.000Z</LastModified>
            </Part>
            <Part>
                <PartNumber>2</PartNumber>
                <ETag>"part-2"</ETag>
                <Size>5242880</Size>
            </Part>
        </ListPartsResult>"#;

        let page = parse_list_parts(xml).unwrap();
        assert!(page.is_truncated);
        assert_eq!(page.next_part_number_marker, Some(2));
        assert_eq!(page.parts.len(), 2);
        assert_eq!(page.parts[0].part_number, 1);
        assert_eq!(page.parts[0].size, Some(5242880));
    }

    #[test]
    fn test_parse_list_multipart_uploads() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
        <ListMultipartUploadsResult>
            <Bucket>mybucket</Bucket>
            <IsTruncated>true</IsTruncated>
            <NextKeyMarker>video.mp4</NextKeyMarker>
            <NextUploadIdMarker>upload-9</NextUploadIdMarker>
            <Upload>
                <Key>video.mp4</Key>
                <UploadId>upload-5</UploadId>
                <Initiated>2023-02-01T08:00:00.000Z</Initiated>
                <Initiator>
                    <ID>initiator-id</ID>
                </Initiator>
                <Owner>
                    <ID>owner-id</ID>
                </Owner>
            </Upload>
        </ListMultipartUploadsResult>"#;

        let page = parse_list_multipart_uploads(xml).unwrap();
        assert!(page.is_truncated);
        assert_eq!(page.next_key_marker, Some("video.mp4".to_string()));
        assert_eq!(page.uploads.len(), 1);
        assert_eq!(page.uploads[0].upload_id, "upload-5");
        assert!(page.uploads[0].initiated.is_some());
        assert_eq!(
            page.uploads[0].initiator.as_ref().unwrap().id,
            Some("initiator-id".to_string())
        );
    }

    #[test]
    fn test_parse_delete_result_mixed() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
        <DeleteResult>
            <Deleted>
                <Key>ok.txt</Key>
            </Deleted>
            <Error>
                <Key>locked.txt</Key>
                <Code>AccessDenied</Code>
                <Message>Access Denied</Message>
            </Error>
            <Deleted>
                <Key>marker.txt</Key>
                <DeleteMarker>true</DeleteMarker>
                <VersionId>v2</VersionId>
            </Deleted>
        </DeleteResult>"#;

        let outcomes = parse_delete_result(xml).unwrap();
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].is_removed());
        assert_eq!(outcomes[0].key(), "ok.txt");
        assert!(!outcomes[1].is_removed());
        match &outcomes[1] {
            DeleteOutcome::Failed { code, .. } => assert_eq!(code, "AccessDenied"),
            other => panic!("expected failure, got {:?}", other),
        }
        match &outcomes[2] {
            DeleteOutcome::Removed {
                delete_marker,
                version_id,
                ..
            } => {
                assert!(delete_marker);
                assert_eq!(version_id.as_deref(), Some("v2"));
            }
            other => panic!("expected removal, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_notification_config() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
        <NotificationConfiguration>
            <TopicConfiguration>
                <Id>notify-images</Id>
                <Topic>arn:aws:sns:us-east-1:1234:images</Topic>
                <Event>s3:ObjectCreated:Put</Event>
                <Event>s3:ObjectCreated:CompleteMultipartUpload</Event>
                <Filter>
                    <S3Key>
                        <FilterRule><Name>prefix</Name><Value>images/</Value></FilterRule>
                        <FilterRule><Name>suffix</Name><Value>.jpg</Value></FilterRule>
                    </S3Key>
                </Filter>
            </TopicConfiguration>
            <QueueConfiguration>
                <Queue>arn:aws:sqs:us-east-1:1234:deletions</Queue>
                <Event>s3:ObjectRemoved:*</Event>
            </QueueConfiguration>
        </NotificationConfiguration>"#;

        let config = parse_notification_config(xml).unwrap();
        assert_eq!(config.topic_configs.len(), 1);
        assert_eq!(config.queue_configs.len(), 1);

        let topic = &config.topic_configs[0];
        assert_eq!(topic.id.as_deref(), Some("notify-images"));
        assert_eq!(topic.topic_arn, "arn:aws:sns:us-east-1:1234:images");
        assert_eq!(topic.events.len(), 2);
        assert_eq!(topic.prefix_filter.as_deref(), Some("images/"));
        assert_eq!(topic.suffix_filter.as_deref(), Some(".jpg"));

        let queue = &config.queue_configs[0];
        assert!(queue.id.is_none());
        assert_eq!(queue.events, vec!["s3:ObjectRemoved:*".to_string()]);
    }

    #[test]
    fn test_parse_notification_config_empty() {
        let xml =
            r#"<?xml version="1.0" encoding="UTF-8"?><NotificationConfiguration/>"#;
        let config = parse_notification_config(xml).unwrap();
        assert!(config.is_empty());
    }

    #[test]
    fn test_notification_xml_round_trip() {
        let original = NotificationConfig::new()
            .with_topic(
                TopicConfig::new("arn:aws:sns:us-east-1:1234:notify")
                    .with_event("s3:ObjectCreated:*")
                    .with_prefix_filter("uploads/"),
            )
            .with_queue(
                QueueConfig::new("arn:aws:sqs:us-east-1:1234:queue")
                    .with_event("s3:ObjectRemoved:Delete")
                    .with_suffix_filter(".log"),
            );

        let xml = build_notification_xml(&original);
        let parsed = parse_notification_config(&xml).unwrap();

        assert_eq!(parsed.topic_configs.len(), 1);
        assert_eq!(parsed.topic_configs[0].topic_arn, original.topic_configs[0].topic_arn);
        assert_eq!(parsed.topic_configs[0].prefix_filter.as_deref(), Some("uploads/"));
        assert_eq!(parsed.queue_configs[0].suffix_filter.as_deref(), Some(".log"));
    }

    #[test]
    fn test_build_notification_xml_empty() {
        let xml = build_notification_xml(&NotificationConfig::new());
        assert!(xml.contains("<NotificationConfiguration"));
        assert!(!xml.contains("TopicConfiguration"));
    }

    #[test]
    fn test_build_delete_objects_xml() {
        let keys = vec!["key1".to_string(), "a&b".to_string()];

        let xml = build_delete_objects_xml(&keys, false);
        assert!(!xml.contains("<Quiet>"));
        assert!(xml.contains("<Key>key1</Key>"));
        assert!(xml.contains("<Key>a&amp;b</Key>"));

        let quiet = build_delete_objects_xml(&keys, true);
        assert!(quiet.contains("<Quiet>true</Quiet>"));
    }

    #[test]
    fn test_build_complete_multipart_xml() {
        let parts = vec![
            CompletedPart {
                part_number: 1,
                e_tag: "\"abc\"".to_string(),
            },
            CompletedPart {
                part_number: 2,
                e_tag: "\"def\"".to_string(),
            },
        ];

        let xml = build_complete_multipart_xml(&parts);
        assert!(xml.contains("<PartNumber>1</PartNumber>"));
        assert!(xml.contains("<PartNumber>2</PartNumber>"));
        assert!(xml.contains("<ETag>&quot;abc&quot;</ETag>"));
    }

    #[test]
    fn test_build_create_bucket_xml() {
        let xml = build_create_bucket_xml("eu-west-1");
        assert!(xml.contains("<LocationConstraint>eu-west-1</LocationConstraint>"));
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("a&b"), "a&amp;b");
        assert_eq!(escape_xml("a<b"), "a&lt;b");
        assert_eq!(escape_xml("a>b"), "a&gt;b");
        assert_eq!(escape_xml("a\"b"), "a&quot;b");
    }
}
