use std::path::PathBuf;

use serde_json::{json, Value};

use doc_extract::extractors::{CsvColumn, JsonPath, RdfQuery, XmlQuery};
use doc_extract::readers::EXTERNAL_FILE;
use doc_extract::sources::list_directory;
use doc_extract::transforms;
use doc_extract::tree::{Matcher, Tag, TextMatch};
use doc_extract::{
    CsvReader, Document, Error, Extractor, Field, HtmlReader, JsonReader, RdfReader, Reader, Result, Source,
    SubjectSelector, XmlReader,
};

fn data(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data").join(name)
}

fn collect<R: Reader>(reader: &R, sources: Vec<Source>) -> Vec<Document> {
    reader.documents(sources).collect::<Result<Vec<_>>>().unwrap()
}

fn csv_reader() -> CsvReader {
    CsvReader::new(vec![
        Field::new("play", Extractor::metadata("play")),
        Field::new("character", Extractor::csv(CsvColumn::new("character"))).required(),
        Field::new("lines", Extractor::csv(CsvColumn::new("line").multiple())),
        Field::new(
            "act_number",
            Extractor::csv(CsvColumn::new("act")).with_transform(transforms::parse_int()),
        ),
        Field::new("index", Extractor::order()),
    ])
    .field_entry("character")
    .required_field("line")
}

#[test]
fn test_csv_groups_runs_of_speakers() {
    let docs = collect(&csv_reader(), vec![Source::path(data("hamlet.csv")).with("play", "Hamlet")]);
    let speakers: Vec<&Value> = docs.iter().map(|d| &d["character"]).collect();
    assert_eq!(
        speakers,
        vec![&json!("HAMLET"), &json!("GHOST"), &json!("HAMLET"), &json!("GHOST"), &json!("HAMLET"), &json!("GHOST")]
    );
    assert_eq!(
        serde_json::to_value(&docs[3]).unwrap(),
        json!({
            "play": "Hamlet",
            "character": "GHOST",
            "lines": [
                "My hour is almost come,",
                "When I to sulph'rous and tormenting flames",
                "Must render up myself."
            ],
            "act_number": null,
            "index": 3
        })
    );
}

#[test]
fn test_fresh_readers_yield_identical_documents() {
    let source = || vec![Source::path(data("hamlet.csv"))];
    assert_eq!(collect(&csv_reader(), source()), collect(&csv_reader(), source()));
}

#[test]
fn test_failing_source_stops_iteration_after_earlier_documents() {
    let reader = csv_reader();
    let mut docs = reader.documents(vec![Source::path(data("hamlet.csv")), Source::path(data("missing.csv"))]);
    for _ in 0..6 {
        assert!(docs.next().unwrap().is_ok());
    }
    assert!(matches!(docs.next(), Some(Err(Error::Io(_)))));
    assert!(docs.next().is_none());
}

#[test]
fn test_directory_sources_carry_file_metadata() {
    let sources = list_directory(&data(""), Some("csv")).unwrap();
    let reader = CsvReader::new(vec![
        Field::new("file", Extractor::metadata("stem")),
        Field::new("line", Extractor::csv(CsvColumn::new("line"))),
    ]);
    let docs = collect(&reader, sources);
    assert_eq!(docs.len(), 10);
    assert!(docs.iter().all(|d| d["file"] == json!("hamlet")));
}

fn xml_reader() -> XmlReader {
    let scene = Tag::matching(Matcher::named("div").with_attribute("type", "scene"), true);
    XmlReader::new(vec![
        Field::new(
            "title",
            Extractor::xml(XmlQuery::new(Tag::FindParent(Matcher::named("TEI")).then(Tag::named("title"))).toplevel()),
        ),
        Field::new(
            "act",
            Extractor::xml(
                XmlQuery::new(Tag::FindParent(Matcher::named("div").with_attribute("type", "act")))
                    .toplevel()
                    .attribute("n"),
            ),
        ),
        Field::new("scene", Extractor::xml(XmlQuery::current().toplevel().attribute("n"))),
        Field::new("character", Extractor::xml(XmlQuery::child("speaker"))).required(),
        Field::new("lines", Extractor::xml(XmlQuery::child("l").multiple())),
        Field::new("stage", Extractor::xml(XmlQuery::new(Tag::Sibling(Matcher::named("stage"))))),
        Field::new("index", Extractor::order()),
    ])
    .toplevel(scene)
    .entry(Tag::child("sp"))
}

#[test]
fn test_xml_entries_with_ancestor_context() {
    let docs = collect(&xml_reader(), vec![Source::path(data("hamlet.xml"))]);
    assert_eq!(docs.len(), 6);
    assert_eq!(
        serde_json::to_value(&docs[0]).unwrap(),
        json!({
            "title": "The Tragedy of Hamlet, Prince of Denmark",
            "act": "I",
            "scene": "V",
            "character": "HAMLET",
            "lines": ["Whither wilt thou lead me? Speak, I'll go no further."],
            "stage": "Enter GHOST and HAMLET",
            "index": 0
        })
    );
    // The unattributed speech in between keeps its position
    assert_eq!(docs[4]["character"], json!("HAMLET"));
    assert_eq!(docs[4]["index"], json!(5));
}

#[test]
fn test_xml_external_file_lookup() {
    let reader = XmlReader::new(vec![
        Field::new("character", Extractor::xml(XmlQuery::child("speaker"))).required(),
        Field::new(
            "description",
            Extractor::xml(
                XmlQuery::child("roleDesc")
                    .secondary_tag("role", TextMatch::Metadata("character".into()))
                    .external_file(Tag::named("castList")),
            ),
        ),
    ])
    .toplevel(Tag::named("body"))
    .entry(Tag::named("sp"));

    let external = data("characters.xml");
    let source = Source::path(data("hamlet.xml")).with(EXTERNAL_FILE, external.to_str().unwrap());
    let docs = collect(&reader, vec![source]);
    assert_eq!(docs.len(), 6);
    assert_eq!(docs[1]["description"], json!("Ghost of Hamlet's Father"));
    assert_eq!(
        docs[2]["description"],
        json!("son to the late, and nephew to the present king")
    );
}

#[test]
fn test_html_direct_children_are_entries() {
    let reader = HtmlReader::new(vec![
        Field::new(
            "page",
            Extractor::xml(XmlQuery::new(Tag::FindParent(Matcher::named("html")).then(Tag::named("title"))).toplevel()),
        ),
        Field::new("character", Extractor::xml(XmlQuery::child("b"))).required(),
        Field::new("line", Extractor::xml(XmlQuery::child("p").flatten())),
    ])
    .toplevel(Tag::matching(Matcher::named("div").with_attribute("class", "scene"), true))
    .entry(Tag::matching(Matcher::named("div").with_attribute("class", "speech"), true));

    let docs = collect(&reader, vec![Source::path(data("hamlet.html"))]);
    assert_eq!(docs.len(), 5);
    assert!(docs.iter().all(|d| d["page"] == json!("Hamlet, Act I, Scene V")));
    assert_eq!(
        docs[3]["line"],
        json!("My hour is almost come, When I to sulph'rous and tormenting flames Must render up myself.")
    );
    assert_eq!(docs[4]["character"], json!("HAMLET"));
}

#[test]
fn test_json_records_with_meta() {
    let reader = JsonReader::new(vec![
        Field::new("act", Extractor::json(JsonPath::new("TITLE"))),
        Field::new("scene", Extractor::json(JsonPath::new("SCENE.TITLE"))),
        Field::new("character", Extractor::json(JsonPath::new("SPEAKER"))),
        Field::new("lines", Extractor::json(JsonPath::new("LINE")).with_transform(transforms::join("\n"))),
    ])
    .record_path(["SCENE", "SPEECH"])
    .meta(["TITLE"])
    .meta(["SCENE", "TITLE"]);

    let docs = collect(&reader, vec![Source::path(data("hamlet.json"))]);
    assert_eq!(docs.len(), 5);
    assert_eq!(
        serde_json::to_value(&docs[3]).unwrap(),
        json!({
            "act": "ACT I",
            "scene": "SCENE V. A more remote part of the platform.",
            "character": "GHOST",
            "lines": "My hour is almost come,\nWhen I to sulph'rous and tormenting flames\nMust render up myself."
        })
    );
}

#[test]
fn test_json_single_document() {
    let reader = JsonReader::new(vec![
        Field::new("act", Extractor::json(JsonPath::new("TITLE"))),
        Field::new("speeches", Extractor::json(JsonPath::keys(["SCENE", "SPEECH"]))),
    ])
    .single_document();
    let docs = collect(&reader, vec![Source::path(data("hamlet.json"))]);
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0]["speeches"].as_array().map(Vec::len), Some(5));
}

#[test]
fn test_rdf_documents_per_line() {
    let speaker = "http://example.org/shakespeare/hasSpeaker";
    let reader = RdfReader::new(vec![
        Field::new("id", Extractor::rdf(RdfQuery::subject()).with_transform(transforms::local_name())),
        Field::new(
            "character",
            Extractor::rdf(RdfQuery::new([speaker])).with_transform(transforms::local_name()),
        ),
        Field::new(
            "lines",
            Extractor::rdf(RdfQuery::new(["http://example.org/shakespeare/hasText"]).collection()),
        ),
        Field::new(
            "opacity",
            Extractor::rdf(RdfQuery::new([speaker, "http://example.org/vision/hasOpacity"])),
        ),
    ])
    .subjects(SubjectSelector::WithPredicate(speaker.into()));

    let docs = collect(&reader, vec![Source::path(data("hamlet.ttl"))]);
    assert_eq!(docs.len(), 5);
    assert_eq!(
        serde_json::to_value(&docs[3]).unwrap(),
        json!({
            "id": "hamlet-actI-scene5-03",
            "character": "GHOST",
            "lines": [
                "My hour is almost come,",
                "When I to sulph'rous and tormenting flames",
                "Must render up myself."
            ],
            "opacity": 0.3
        })
    );
    assert_eq!(docs[4]["opacity"], json!(1.0));
}

#[test]
fn test_extractor_for_another_format_is_rejected_before_reading() {
    let reader = JsonReader::new(vec![Field::new("line", Extractor::csv(CsvColumn::new("line")))]);
    let mut docs = reader.documents(vec![Source::path(data("hamlet.json"))]);
    assert!(matches!(docs.next(), Some(Err(Error::IncompatibleExtractor { .. }))));
    assert!(docs.next().is_none());
}
