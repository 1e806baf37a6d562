mod common;

use csw_request::context::ElementSetName;
use csw_request::geojson::read_coverage;
use csw_request::{
    compile, AxisConvention, CswError, Filter, LikeOptions, Reproject, Reprojector,
    RequestContext, SearchCriteria,
};
use geo_types::Geometry;

use common::{assert_similar, coordinate_values, fixture, parse, texts_of};

const DRAWN_AREA: &str = r#"{"type":"FeatureCollection","features":[{"type":"Feature","geometry":{"type":"Polygon","coordinates":[[[292864,6845440],[292864,6781952],[393216,6781952],[393216,6845440],[292864,6845440]]]},"properties":{"area":"Alue ei saa muodostaa silmukkaa."},"id":"drawFeature3"}],"crs":"EPSG:3067"}"#;

fn lon_lat_reprojector() -> Reprojector {
    Reprojector::new().with_target_convention(AxisConvention::EastingFirst)
}

fn coverage_filter() -> Filter {
    let coverage = read_coverage(DRAWN_AREA).unwrap();
    let source = coverage.crs.as_deref().unwrap();
    let operand = lon_lat_reprojector()
        .reproject_operand(&coverage.geometry, source, "EPSG:4326")
        .unwrap();
    Filter::intersects("ows:BoundingBox", operand).unwrap()
}

#[test]
fn test_with_no_filter() {
    let result = compile(&RequestContext::default(), None);
    assert_eq!(result, Err(CswError::MissingFilter));
}

#[test]
fn test_simple_filter() {
    let filter = Filter::equals("myprop", "my value").unwrap();
    let request = compile(&RequestContext::default(), Some(&filter)).unwrap();
    assert_similar(&request, &fixture("GetRecords-simple.xml"));
}

#[test]
fn test_multi_filter() {
    let equals = Filter::equals("myprop", "my value").unwrap();
    let like = Filter::like("query", "input*", LikeOptions::new('*', '?', '\\', false)).unwrap();
    let request = compile(&RequestContext::default(), Some(&equals.and(like))).unwrap();
    assert_similar(&request, &fixture("GetRecords-multi.xml"));
}

#[test]
fn test_coverage_filter() {
    let request = compile(&RequestContext::default(), Some(&coverage_filter())).unwrap();
    assert_similar(&request, &fixture("GetRecords-coverage.xml"));
}

#[test]
fn test_coverage_round_trip() {
    let request = compile(&RequestContext::default(), Some(&coverage_filter())).unwrap();
    let coordinates = texts_of(&parse(&request), "gml:coordinates");
    assert_eq!(coordinates.len(), 1);

    let values = coordinate_values(&coordinates[0]);
    let ring: Vec<(f64, f64)> = values.chunks(2).map(|c| (c[0], c[1])).collect();
    let polygon = geo_types::Polygon::new(ring.into(), vec![]);

    let back = Reprojector::new()
        .with_source_convention(AxisConvention::EastingFirst)
        .reproject(&Geometry::Polygon(polygon), "EPSG:4326", "EPSG:3067")
        .unwrap();
    let Geometry::Polygon(back) = back else {
        panic!("expected a polygon");
    };

    let original = [
        (292864.0, 6845440.0),
        (292864.0, 6781952.0),
        (393216.0, 6781952.0),
        (393216.0, 6845440.0),
        (292864.0, 6845440.0),
    ];
    assert_eq!(back.exterior().0.len(), original.len());
    for (c, (x, y)) in back.exterior().0.iter().zip(original) {
        // Eight decimals of a degree are about a millimetre.
        assert!((c.x - x).abs() < 0.01, "x {} vs {}", c.x, x);
        assert!((c.y - y).abs() < 0.01, "y {} vs {}", c.y, y);
    }
}

#[test]
fn test_authority_axis_order_swaps_coordinates() {
    let coverage = read_coverage(DRAWN_AREA).unwrap();
    let operand = Reprojector::new()
        .reproject_operand(&coverage.geometry, "EPSG:3067", "EPSG:4326")
        .unwrap();
    assert_eq!(operand.srs_name(), "urn:ogc:def:crs:EPSG::4326");

    let filter = Filter::intersects("ows:BoundingBox", operand).unwrap();
    let request = compile(&RequestContext::default(), Some(&filter)).unwrap();
    let text = &texts_of(&parse(&request), "gml:coordinates")[0];
    let values = coordinate_values(text);
    assert!((values[0] - 61.68603141).abs() < 1e-6);
    assert!((values[1] - 23.08385356).abs() < 1e-6);
}

#[test]
fn test_invalid_property_produces_no_document() {
    assert!(matches!(Filter::equals("", "value"), Err(CswError::InvalidArgument(_))));
}

#[test]
fn test_empty_filter_requests_everything() {
    let empty = Filter::equals("myprop", "").unwrap();
    assert!(empty.is_empty());

    let request = compile(&RequestContext::default(), Some(&empty)).unwrap();
    let root = parse(&request);
    assert_eq!(root.name, "csw:GetRecords");
    let query = &root.children[0];
    assert_eq!(query.children.len(), 1);
    assert_eq!(query.children[0].name, "csw:ElementSetName");
}

#[test]
fn test_and_with_empty_is_identity() {
    let equals = Filter::equals("myprop", "my value").unwrap();
    let combined = equals.clone().and(Filter::empty());
    assert_eq!(combined, equals);

    let a = compile(&RequestContext::default(), Some(&equals)).unwrap();
    let b = compile(&RequestContext::default(), Some(&combined)).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_search_criteria_end_to_end() {
    let criteria: SearchCriteria = serde_json::from_str(&format!(
        r#"{{"text":"lake","equals":[{{"property":"apiso:Type","value":"dataset"}}],"coverage":{}}}"#,
        DRAWN_AREA
    ))
    .unwrap();
    let context = RequestContext::default().with_element_set(ElementSetName::Summary);
    let filter = criteria
        .to_filter(&context, &LikeOptions::default(), &lon_lat_reprojector())
        .unwrap();
    assert_eq!(filter.depth(), 3);

    let request = compile(&context, Some(&filter)).unwrap();
    let root = parse(&request);
    assert_eq!(root.attributes["xmlns:apiso"], "http://www.opengis.net/cat/csw/apiso/1.0");
    assert_eq!(
        texts_of(&root, "ogc:PropertyName"),
        vec!["csw:AnyText", "apiso:Type", "ows:BoundingBox"]
    );
    assert_eq!(texts_of(&root, "ogc:Literal")[0], "*lake*");
    assert_eq!(texts_of(&root, "csw:ElementSetName"), vec!["summary"]);
}
