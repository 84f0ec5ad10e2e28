//! Map overlay and interactive session against an in-memory service.

mod common;

use common::{date, default_bbox, range, MockService};
use std::io::Cursor;
use waterbox_ee::EeError;
use waterbox_runner::{
    render_overlay, run_interactive, AreaError, AreaQueryClient, OverlayStyle, QueryCache,
    QueryInputs, QuerySettings, SessionSummary,
};

#[test]
fn test_overlay_centered_on_box() {
    let service = MockService::with_area(1.0);
    let client = AreaQueryClient::new(&service, QuerySettings::default());
    let bbox = waterbox_geo::BoundingBox::new(20.0, 52.0, 20.5, 52.5).unwrap();
    let mask = client.water_mask(&range(2, 3), &bbox);

    let overlay = render_overlay(&service, &mask, &bbox, &OverlayStyle::default()).unwrap();
    assert_eq!(overlay.center, (52.25, 20.25));
    assert_eq!(overlay.zoom, 10);
    assert_eq!(overlay.opacity, 0.7);
    assert!(overlay.image_url.ends_with(":getPixels"));

    let html = overlay.to_html();
    assert!(html.contains("[52.25,20.25]"));
    assert!(html.contains("opacity: 0.7"));
    assert!(html.contains(&overlay.image_url));

    let calls = service.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].root().function_name(), Some("Image.clipToBoundsAndScale"));
}

#[test]
fn test_thumbnail_failure_is_an_error() {
    let service = MockService::with_area(1.0).failing_thumbnails("quota exceeded");
    let client = AreaQueryClient::new(&service, QuerySettings::default());
    let mask = client.water_mask(&range(2, 3), &default_bbox());

    let err = render_overlay(&service, &mask, &default_bbox(), &OverlayStyle::default()).unwrap_err();
    assert!(matches!(err, AreaError::Service(EeError::Api { .. })));
    assert!(err.to_string().contains("quota exceeded"));
}

#[test]
fn test_overlay_file_written() {
    let service = MockService::with_area(1.0);
    let client = AreaQueryClient::new(&service, QuerySettings::default());
    let mask = client.water_mask(&range(2, 3), &default_bbox());
    let overlay = render_overlay(&service, &mask, &default_bbox(), &OverlayStyle::default()).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("water.html");
    overlay.write_html(&path).unwrap();
    let html = std::fs::read_to_string(&path).unwrap();
    assert!(html.contains("L.imageOverlay"));
    assert!(html.contains("[52.5,20.5]"));
}

#[test]
fn test_interactive_session() {
    let service = MockService::with_area(5_000_000.0);
    let client =
        AreaQueryClient::new(&service, QuerySettings::default()).with_cache(QueryCache::new(4));

    let input = "\n\
        2021-04-02 2021-04-03 20 52 21 53\n\
        - - - - - -\n\
        not-a-date\n\
        - - 22\n\
        - 2021-04-04\n\
        quit\n\
        2021-04-02 2021-04-03 20 52 21 53\n";
    let mut output = Vec::new();
    let summary = run_interactive(
        &client,
        QueryInputs::default(),
        Cursor::new(input),
        &mut output,
    )
    .unwrap();

    // Two lines fail: the bad date, and min_lon 22 beyond max_lon 21.
    assert_eq!(
        summary,
        SessionSummary {
            answered: 3,
            failed: 2
        }
    );

    let text = String::from_utf8(output).unwrap();
    assert_eq!(
        text.matches("Total water area for the selected date range: 5.00 km^2").count(),
        3
    );
    assert_eq!(text.matches("Error:").count(), 2);

    // Repeated line served from the cache; the changed end date is a new query.
    assert_eq!(service.call_count(), 4);
}

#[test]
fn test_interactive_reports_missing_image_and_continues() {
    let service = MockService::empty();
    let client = AreaQueryClient::new(&service, QuerySettings::default());
    let initial = QueryInputs {
        end: date(2),
        ..QueryInputs::default()
    };

    let mut output = Vec::new();
    let summary = run_interactive(&client, initial, Cursor::new("- -\n- -\n"), &mut output).unwrap();

    assert_eq!(summary.failed, 2);
    let text = String::from_utf8(output).unwrap();
    assert_eq!(text.matches("No classified image found").count(), 2);
}
