//! End-to-end rendering tests
//!
//! Drawn text is captured through the `on_text` callback; output bytes are
//! re-parsed with lopdf to check the page tree.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use template::{
    parse_record, parse_template, render_template_to_pdf, DrawPhase, FetchedImage, FontBytes,
    ImageFetchError, ImageFetcher, PreviewMode, RenderOptions, RenderOutput, TemplateDataRecord,
    TemplateDefinition, TemplateError, TextDrawEvent,
};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn template(value: serde_json::Value) -> TemplateDefinition {
    parse_template(&value.to_string()).unwrap()
}

fn record(value: serde_json::Value) -> TemplateDataRecord {
    parse_record(&value.to_string()).unwrap()
}

/// Render with the built-in Helvetica, capturing every text run
fn render(
    template: &TemplateDefinition,
    data: Option<&TemplateDataRecord>,
    options: RenderOptions,
) -> template::Result<(RenderOutput, Vec<TextDrawEvent>)> {
    init_logger();
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    let options = options.on_text(move |event| sink.borrow_mut().push(event.clone()));
    let output = render_template_to_pdf(template, data, FontBytes::default(), options)?;
    let events = events.borrow().clone();
    Ok((output, events))
}

fn pdf_page_count(bytes: &[u8]) -> usize {
    lopdf::Document::load_mem(bytes).unwrap().get_pages().len()
}

fn texts<'e>(events: &'e [TextDrawEvent], phase: DrawPhase) -> Vec<&'e TextDrawEvent> {
    events.iter().filter(|e| e.phase == phase).collect()
}

fn table_template(mode: &str, rows_field: &str) -> serde_json::Value {
    json!({
        "id": "invoice",
        "pageSize": "A4",
        "structureType": "list_v1",
        "elements": [{
            "type": "table",
            "id": "items",
            "position": {"x": 40, "y": 100},
            "size": {"width": 500, "height": 600},
            "dataSource": {"type": "kintoneSubtable", "fieldCode": rows_field},
            "rowHeight": 20,
            "columns": [
                {"id": "item_name", "title": "Item", "fieldCode": "ItemName", "width": 300, "overflow": "wrap"},
                {"id": "amount", "title": "Amount", "fieldCode": "Amount", "width": 200}
            ]
        }],
        "summary": {
            "mode": mode,
            "rows": [{"op": "sum", "columnId": "amount", "fieldCode": "Amount", "kind": "both"}]
        }
    })
}

#[test]
fn last_page_total_is_exact() {
    let template = template(table_template("lastPageOnly", "Items"));
    let data = record(json!({
        "Items": [
            {"ItemName": "A", "Amount": "100"},
            {"ItemName": "B", "Amount": "200.50"}
        ]
    }));

    let (output, events) = render(&template, Some(&data), RenderOptions::new()).unwrap();

    assert_eq!(output.page_count, 1);
    let summary: Vec<&str> = texts(&events, DrawPhase::Summary)
        .iter()
        .map(|e| e.text.as_str())
        .collect();
    assert_eq!(summary, vec!["Total", "300.5"]);
    assert!(output.warnings.is_empty(), "{:?}", output.warnings);
}

#[test]
fn subtotals_reset_per_page() {
    let mut value = table_template("everyPageSubtotal+lastTotal", "Items");
    value["elements"].as_array_mut().unwrap().push(json!({
        "type": "text",
        "id": "title",
        "region": "header",
        "repeat": "everyPage",
        "position": {"x": 40, "y": 40},
        "size": {"width": 300, "height": 20},
        "dataSource": {"type": "static", "value": "Invoice"}
    }));
    let template = template(value);
    let rows: Vec<_> = (1..=40)
        .map(|i| json!({"ItemName": format!("Item {i}"), "Amount": i}))
        .collect();
    let data = record(json!({ "Items": rows }));

    let (output, events) = render(&template, Some(&data), RenderOptions::new()).unwrap();
    assert_eq!(output.page_count, 2);
    assert_eq!(pdf_page_count(&output.bytes), 2);

    // amount cells are the numeric ones; item names are not
    let page_cells = |page: usize| -> i64 {
        texts(&events, DrawPhase::Cell)
            .iter()
            .filter(|e| e.page == page)
            .filter_map(|e| e.text.parse::<i64>().ok())
            .sum()
    };
    let summary_values = |page: usize| -> Vec<i64> {
        texts(&events, DrawPhase::Summary)
            .iter()
            .filter(|e| e.page == page)
            .filter_map(|e| e.text.parse::<i64>().ok())
            .collect()
    };

    let first = page_cells(1);
    let second = page_cells(2);
    assert_eq!(first + second, 820);
    assert_eq!(summary_values(1), vec![first]);
    // page 2: its own subtotal, then the grand total
    assert_eq!(summary_values(2), vec![second, 820]);

    let headers: Vec<usize> = texts(&events, DrawPhase::Header)
        .iter()
        .filter(|e| e.text == "Invoice")
        .map(|e| e.page)
        .collect();
    assert_eq!(headers, vec![1, 2]);

    let stamps: Vec<&str> = texts(&events, DrawPhase::PageNumber)
        .iter()
        .map(|e| e.text.as_str())
        .collect();
    assert_eq!(stamps, vec!["1 / 2", "2 / 2"]);
}

struct NotFound;

impl ImageFetcher for NotFound {
    fn fetch(&self, _url: &str, _timeout: Duration) -> Result<FetchedImage, ImageFetchError> {
        Err(ImageFetchError::Status(404))
    }
}

#[test]
fn missing_image_draws_placeholder() {
    let template = template(json!({
        "id": "photo",
        "elements": [{
            "type": "image",
            "id": "logo",
            "position": {"x": 40, "y": 40},
            "size": {"width": 120, "height": 60},
            "dataSource": {"type": "static", "value": "https://img.example/missing.png"}
        }]
    }));

    let options = RenderOptions::new().with_image_fetcher(NotFound);
    let (output, events) = render(&template, None, options).unwrap();

    assert!(events
        .iter()
        .any(|e| e.element_id == "logo" && e.text == "IMAGE"));
    assert!(
        output.warnings.iter().any(|w| w.starts_with("[image]")),
        "{:?}",
        output.warnings
    );
}

fn label_template() -> TemplateDefinition {
    template(json!({
        "id": "labels",
        "structureType": "label_v1",
        "labelSheet": {
            "paperWidthMm": 210,
            "paperHeightMm": 297,
            "cols": 2,
            "rows": 5,
            "marginMm": {"top": 10, "right": 5, "bottom": 10, "left": 5},
            "gapMm": {"x": 2, "y": 3},
            "mapping": {
                "titleField": "Name",
                "subFields": ["Sku"],
                "qrField": "Code",
                "copiesField": "Copies"
            }
        }
    }))
}

#[test]
fn label_copies_span_sheets() {
    let template = label_template();
    let data = record(json!({"Name": "Widget", "Sku": "W-1", "Copies": "12", "Code": ""}));

    let (output, events) = render(&template, Some(&data), RenderOptions::new()).unwrap();

    assert_eq!(output.page_count, 2);
    assert_eq!(pdf_page_count(&output.bytes), 2);
    let per_page = |page: usize| {
        events
            .iter()
            .filter(|e| e.page == page && e.text == "QR")
            .count()
    };
    assert_eq!((per_page(1), per_page(2)), (10, 2));
    assert!(texts(&events, DrawPhase::PageNumber).is_empty());
}

#[test]
fn label_with_payload_has_no_placeholder() {
    let template = label_template();
    let data = record(json!({"Name": "Widget", "Copies": 3, "Code": "ABC-123"}));

    let (output, events) = render(&template, Some(&data), RenderOptions::new()).unwrap();

    assert_eq!(output.page_count, 1);
    assert!(!events.iter().any(|e| e.text == "QR"));
    assert_eq!(events.iter().filter(|e| e.text == "Widget").count(), 3);
}

#[test]
fn canvas_scale_does_not_move_text() {
    let at_scale = |k: f64| {
        template(json!({
            "id": "scaled",
            "showPageNumbers": false,
            "canvas": {"width": 595.0 * k, "height": 842.0 * k},
            "elements": [{
                "type": "text",
                "id": "greeting",
                "position": {"x": 100.0 * k, "y": 100.0 * k},
                "size": {"width": 200.0 * k, "height": 20.0 * k},
                "fontSize": 10.0 * k,
                "dataSource": {"type": "static", "value": "Hello"}
            }]
        }))
    };

    let (_, small) = render(&at_scale(1.0), None, RenderOptions::new()).unwrap();
    let (_, large) = render(&at_scale(2.0), None, RenderOptions::new()).unwrap();

    assert_eq!(small.len(), 1);
    assert_eq!(large.len(), 1);
    let (a, b) = (&small[0], &large[0]);
    assert!((a.x - b.x).abs() < 1e-6);
    assert!((a.y - b.y).abs() < 1e-6);
    assert!((a.font_size - b.font_size).abs() < 1e-6);
}

fn long_table(rows: usize) -> (TemplateDefinition, TemplateDataRecord) {
    let mut value = table_template("none", "Items");
    value["elements"][0]["rowHeight"] = json!(18);
    let rows: Vec<_> = (1..=rows)
        .map(|i| json!({"ItemName": format!("Row {i}"), "Amount": "1"}))
        .collect();
    (template(value), record(json!({ "Items": rows })))
}

#[test]
fn long_table_terminates() {
    let (template, data) = long_table(500);

    let (output, events) = render(&template, Some(&data), RenderOptions::new()).unwrap();

    assert!((12..=14).contains(&output.page_count), "{}", output.page_count);
    let drawn = texts(&events, DrawPhase::Cell)
        .iter()
        .filter(|e| e.text.starts_with("Row "))
        .count();
    assert_eq!(drawn, 500);
}

#[test]
fn page_ceiling_is_an_error() {
    let (template, data) = long_table(500);

    let err = render(&template, Some(&data), RenderOptions::new().with_max_pages(3)).unwrap_err();

    assert!(matches!(err, TemplateError::PageLimitExceeded { limit: 3 }));
}

#[test]
fn field_code_preview_echoes_codes() {
    let template = template(table_template("lastPageOnly", "Items"));

    let options = RenderOptions::new().with_preview_mode(PreviewMode::FieldCode);
    let (output, events) = render(&template, None, options).unwrap();

    assert_eq!(output.page_count, 1);
    let cells: Vec<&str> = texts(&events, DrawPhase::Cell)
        .iter()
        .map(|e| e.text.as_str())
        .collect();
    assert_eq!(cells, vec!["ItemName", "Amount"]);
}

#[test]
fn computed_total_reaches_footer() {
    let mut value = table_template("none", "Items");
    value["summary"] = json!(null);
    value["elements"].as_array_mut().unwrap().push(json!({
        "type": "text",
        "id": "grand",
        "region": "footer",
        "repeat": "lastPageOnly",
        "position": {"x": 400, "y": 780},
        "size": {"width": 140, "height": 14},
        "dataSource": {"type": "kintone", "fieldCode": "__computedTotal"}
    }));
    let template = template(value);
    let data = record(json!({
        "Items": [{"ItemName": "A", "Amount": "100"}, {"ItemName": "B", "Amount": "200.50"}]
    }));

    let (_, events) = render(&template, Some(&data), RenderOptions::new()).unwrap();

    let footer: Vec<&str> = texts(&events, DrawPhase::Footer)
        .iter()
        .map(|e| e.text.as_str())
        .collect();
    assert_eq!(footer, vec!["300.5"]);
}

fn card_template(fields: serde_json::Value) -> TemplateDefinition {
    template(json!({
        "id": "cards",
        "structureType": "cards_v1",
        "elements": [{
            "type": "cardList",
            "id": "cards",
            "position": {"x": 40, "y": 100},
            "size": {"width": 300, "height": 600},
            "dataSource": {"type": "kintoneSubtable", "fieldCode": "Items"},
            "fields": fields
        }]
    }))
}

#[test]
fn empty_card_list_shows_samples() {
    let template = card_template(json!([
        {"id": "name", "fieldCode": "Name"},
        {"id": "qty", "label": "Qty", "fieldCode": "Qty"}
    ]));
    let data = record(json!({"Items": []}));

    let (output, events) = render(&template, Some(&data), RenderOptions::new()).unwrap();

    assert_eq!(output.page_count, 1);
    assert_eq!(events.iter().filter(|e| e.text == "SAMPLE").count(), 3);
    assert!(events.iter().any(|e| e.text == "Sample item 1"));
}

#[test]
fn cards_paginate_in_order() {
    let template = card_template(json!([
        {"id": "name", "fieldCode": "Name"},
        {"id": "qty", "label": "Qty", "fieldCode": "Qty"}
    ]));
    let rows: Vec<_> = (1..=30)
        .map(|i| json!({"Name": format!("Card {i}"), "Qty": i}))
        .collect();
    let data = record(json!({ "Items": rows }));

    let (output, events) = render(&template, Some(&data), RenderOptions::new()).unwrap();

    assert!(output.page_count > 1);
    let titles: Vec<&str> = texts(&events, DrawPhase::Card)
        .iter()
        .map(|e| e.text.as_str())
        .filter(|t| t.starts_with("Card "))
        .collect();
    let expected: Vec<String> = (1..=30).map(|i| format!("Card {i}")).collect();
    assert_eq!(titles, expected);
    assert!(events.iter().any(|e| e.text == "Qty: 30"));
}

#[test]
fn debug_warnings_need_debug_flag() {
    let template = template(json!({"id": "blank", "elements": []}));

    let (quiet, _) = render(&template, None, RenderOptions::new()).unwrap();
    let (verbose, _) = render(&template, None, RenderOptions::new().with_debug(true)).unwrap();

    assert!(quiet.warnings.is_empty());
    assert_eq!(verbose.warnings, vec!["[debug] template has no body block".to_string()]);
}

fn helvetica_width(text: &str, size: f64) -> f64 {
    pdf_core::FontData::standard("measure", pdf_core::StandardFont::Helvetica).text_width(text, size)
}

#[test]
fn cell_overflow_policies_respect_column_width() {
    let long = "Extra wide product name";
    let template = template(json!({
        "id": "overflow",
        "elements": [{
            "type": "table",
            "id": "items",
            "position": {"x": 40, "y": 100},
            "size": {"width": 240, "height": 600},
            "dataSource": {"type": "kintoneSubtable", "fieldCode": "Items"},
            "fontSize": 9,
            "columns": [
                {"id": "shrunk", "fieldCode": "Name", "width": 80, "overflow": "shrink"},
                {"id": "cut", "fieldCode": "Name", "width": 80, "overflow": "ellipsis"},
                {"id": "clipped", "fieldCode": "Name", "width": 80, "overflow": "clip"}
            ]
        }]
    }));
    let data = record(json!({"Items": [{"Name": long}]}));

    let (_, events) = render(&template, Some(&data), RenderOptions::new()).unwrap();

    let cells = texts(&events, DrawPhase::Cell);
    assert_eq!(cells.len(), 3);
    // 80pt column less 3pt padding each side
    let inner = 74.0;

    let shrunk = cells[0];
    assert_eq!(shrunk.text, long);
    assert!(shrunk.font_size < 9.0);
    assert!(helvetica_width(&shrunk.text, shrunk.font_size) <= inner);

    let cut = cells[1];
    assert!(cut.text.ends_with("..."), "{}", cut.text);
    assert!(long.starts_with(cut.text.trim_end_matches("...")));
    assert_eq!(cut.font_size, 9.0);
    assert!(helvetica_width(&cut.text, cut.font_size) <= inner);

    let clipped = cells[2];
    assert_eq!(clipped.text, long);
    assert_eq!(clipped.font_size, 9.0);
}

fn amount_rows(count: usize) -> TemplateDataRecord {
    let rows: Vec<_> = (1..=count)
        .map(|i| json!({"ItemName": format!("Row {i}"), "Amount": "1"}))
        .collect();
    record(json!({ "Items": rows }))
}

#[test]
fn last_page_total_moves_to_new_page_when_full() {
    let template = template(table_template("lastPageOnly", "Items"));

    // 34 rows of 20pt from y=120 end exactly at 800; the body ends near 802
    let (output, events) = render(&template, Some(&amount_rows(34)), RenderOptions::new()).unwrap();

    assert_eq!(output.page_count, 2);
    assert!(texts(&events, DrawPhase::Cell).iter().all(|e| e.page == 1));
    let summary: Vec<(usize, &str)> = texts(&events, DrawPhase::Summary)
        .iter()
        .map(|e| (e.page, e.text.as_str()))
        .collect();
    assert_eq!(summary, vec![(2, "Total"), (2, "34")]);
    assert!(output.warnings.is_empty(), "{:?}", output.warnings);

    // one row fewer leaves room for the total on the first page
    let (output, _) = render(&template, Some(&amount_rows(33)), RenderOptions::new()).unwrap();
    assert_eq!(output.page_count, 1);
}

#[test]
fn oversized_summary_block_warns() {
    let mut value = table_template("lastPageOnly", "Items");
    let rows: Vec<_> = (0..50)
        .map(|_| json!({"op": "sum", "columnId": "amount", "fieldCode": "Amount"}))
        .collect();
    value["summary"]["rows"] = json!(rows);
    let template = template(value);

    let (output, _) = render(&template, Some(&amount_rows(1)), RenderOptions::new()).unwrap();

    assert_eq!(output.page_count, 2);
    let layout: Vec<&String> = output
        .warnings
        .iter()
        .filter(|w| w.contains("summary rows cannot fit on a page"))
        .collect();
    assert_eq!(layout.len(), 1, "{:?}", output.warnings);
    assert!(layout[0].starts_with("[layout]"));
}

fn mixed_body(structure: &str) -> TemplateDefinition {
    let mut value = table_template("none", "Items");
    value["structureType"] = json!(structure);
    value["summary"] = json!(null);
    value["elements"].as_array_mut().unwrap().push(json!({
        "type": "cardList",
        "id": "cards",
        "position": {"x": 40, "y": 100},
        "size": {"width": 300, "height": 600},
        "dataSource": {"type": "kintoneSubtable", "fieldCode": "Items"},
        "fields": [{"id": "name", "fieldCode": "ItemName"}]
    }));
    template(value)
}

#[test]
fn table_and_card_list_render_one_body() {
    let data = amount_rows(2);
    let both = "[layout] template has both a table and a card list; rendering one";

    let (list, events) = render(&mixed_body("list_v1"), Some(&data), RenderOptions::new()).unwrap();
    assert!(list.warnings.iter().any(|w| w == both), "{:?}", list.warnings);
    assert!(!texts(&events, DrawPhase::Cell).is_empty());
    assert!(texts(&events, DrawPhase::Card).is_empty());

    let (cards, events) = render(&mixed_body("cards_v1"), Some(&data), RenderOptions::new()).unwrap();
    assert!(cards.warnings.iter().any(|w| w == both), "{:?}", cards.warnings);
    assert!(texts(&events, DrawPhase::Cell).is_empty());
    let titles: Vec<&str> = texts(&events, DrawPhase::Card)
        .iter()
        .map(|e| e.text.as_str())
        .collect();
    assert_eq!(titles, vec!["Row 1", "Row 2"]);
}

#[test]
fn extra_tables_are_skipped_for_items() {
    let mut value = table_template("none", "Items");
    value["summary"] = json!(null);
    let mut extra = value["elements"][0].clone();
    extra["id"] = json!("extra");
    value["elements"].as_array_mut().unwrap().insert(0, extra);
    let template = template(value);

    let (output, events) = render(&template, Some(&amount_rows(2)), RenderOptions::new()).unwrap();

    assert!(
        output
            .warnings
            .iter()
            .any(|w| w.starts_with("[layout] template has 2 table elements; rendering one")),
        "{:?}",
        output.warnings
    );
    let cells = texts(&events, DrawPhase::Cell);
    assert_eq!(cells.len(), 4);
    assert!(cells.iter().all(|e| e.element_id == "items"));
}

#[test]
fn first_and_last_page_furniture() {
    let mut value = table_template("none", "Items");
    value["summary"] = json!(null);
    value["elements"][0]["rowHeight"] = json!(18);
    let furniture = [
        ("cover", "header", "firstPageOnly", 40, "Cover"),
        ("notice", "footer", "everyPage", 790, "Confidential"),
        ("closing", "footer", "lastPageOnly", 805, "End"),
    ];
    for (id, region, repeat, y, text) in furniture {
        value["elements"].as_array_mut().unwrap().push(json!({
            "type": "text",
            "id": id,
            "region": region,
            "repeat": repeat,
            "position": {"x": 40, "y": y},
            "size": {"width": 300, "height": 14},
            "dataSource": {"type": "static", "value": text}
        }));
    }
    let template = template(value);

    let (output, events) = render(&template, Some(&amount_rows(100)), RenderOptions::new()).unwrap();

    assert_eq!(output.page_count, 3);
    let pages_of = |text: &str| -> Vec<usize> {
        events
            .iter()
            .filter(|e| e.text == text)
            .map(|e| e.page)
            .collect()
    };
    assert_eq!(pages_of("Cover"), vec![1]);
    assert_eq!(pages_of("Confidential"), vec![1, 2, 3]);
    assert_eq!(pages_of("End"), vec![3]);
}
