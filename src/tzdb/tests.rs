use super::*;

const BASE_DIR: &str = "./src/tzdb/tests";
const SOURCE: &str = "https://example.com/zones.csv";

macro_rules! run_tests {
    ($($name:ident),* $(,)?) => {
        $(#[test]
        fn $name() {
            run_test(
                stringify!($name),
                include_str!(concat!("./tests/", stringify!($name), ".csv"))
            );
        })*
    }
}

fn options() -> Options<'static> {
    Options {
        source: SOURCE,
        ..Options::default()
    }
}

#[track_caller]
fn run_test(test_name: &str, input: &str) {
    use std::io::Write as _;

    let dataset = Dataset::from_csv(input.as_bytes(), Duplicates::Reject).unwrap();
    let artifacts = generate(&dataset, &options()).unwrap();

    let mut mint = goldenfile::Mint::new(format!("{BASE_DIR}/goldenfiles"));
    let mut file = mint.new_goldenfile(format!("{test_name}.cpp")).unwrap();
    let _ = write!(file, "{}", artifacts.cpp_source);
    let mut file = mint.new_goldenfile(format!("{test_name}.js")).unwrap();
    let _ = write!(file, "{}", artifacts.selection_list);
}

run_tests! {
    africa,
    mixed,
}

#[test]
fn header() {
    use std::io::Write as _;

    let mut mint = goldenfile::Mint::new(format!("{BASE_DIR}/goldenfiles"));
    let mut file = mint.new_goldenfile("TZDB.h").unwrap();
    let mut header = String::new();
    emit_cpp_header(&mut header).unwrap();
    let _ = write!(file, "{header}");
}

#[test]
fn symbols() {
    assert_eq!(symbol("TZ", "Africa", "Accra"), "TZ_Africa_Accra");
    assert_eq!(
        symbol("TZ", "America", "Argentina/Buenos_Aires"),
        "TZ_America_Argentina_Buenos_Aires"
    );
    assert_eq!(symbol("TZ", "Etc", "GMT-5"), "TZ_Etc_GMTm5");
    assert_eq!(symbol("TZ", "Etc", "GMT+5"), "TZ_Etc_GMTp5");
    assert_eq!(
        symbol("TZ", "America", "Indiana/Knox-IN+x"),
        "TZ_America_Indiana_KnoxmINpx"
    );
}

#[test]
fn grouping() {
    let dataset = Dataset::from_zones(
        [
            "Europe/Paris",
            "Africa/Accra",
            "Europe/Berlin",
            "America/Argentina/Buenos_Aires",
            "Africa/Abidjan",
        ],
        Duplicates::Warn,
    )
    .unwrap();
    let areas = dataset
        .areas()
        .map(|(area, cities)| (area, cities.to_vec()))
        .collect::<Vec<_>>();
    assert_eq!(
        areas,
        [
            ("Europe", vec!["Paris".to_string(), "Berlin".to_string()]),
            ("Africa", vec!["Accra".to_string(), "Abidjan".to_string()]),
            ("America", vec!["Argentina/Buenos_Aires".to_string()]),
        ],
        "areas and cities should keep first-seen order"
    );
    assert_eq!(dataset.area_count(), 3);
    assert_eq!(dataset.zone_count(), 5);
}

#[test]
fn limits() {
    let dataset = Dataset::from_zones(
        ["Africa/Abidjan", "America/Argentina/Buenos_Aires", "Etc/Zürich"],
        Duplicates::Warn,
    )
    .unwrap();
    assert_eq!(dataset.limits(), BufferLimits { area: 8, city: 23 });

    for (area, cities) in dataset.areas() {
        assert!(area.chars().count() < dataset.limits().area);
        for city in cities {
            assert!(city.chars().count() < dataset.limits().city);
        }
    }

    let dataset = Dataset::from_zones(["Etc/Zürich"], Duplicates::Warn).unwrap();
    assert_eq!(
        dataset.limits(),
        BufferLimits { area: 4, city: 7 },
        "lengths should be counted in characters"
    );

    let empty = Dataset::from_zones(Vec::<&str>::new(), Duplicates::Warn).unwrap();
    assert_eq!(empty.limits(), BufferLimits { area: 1, city: 1 });
}

#[test]
fn missing_separator() {
    let err = Dataset::from_zones(["Africa/Accra", "UTC"], Duplicates::Warn).unwrap_err();
    assert!(
        matches!(&err, Error::MissingSeparator { line: 2, zone } if zone == "UTC"),
        "{err}"
    );

    let err = Dataset::from_csv(
        "\"Africa/Accra\",\"GMT0\"\n\"GMT\",\"GMT0\"\n".as_bytes(),
        Duplicates::Warn,
    )
    .unwrap_err();
    assert!(matches!(err, Error::MissingSeparator { line: 2, .. }));

    let err = Dataset::from_csv("\"A/B\"\n\n\n\"Bad\"\n".as_bytes(), Duplicates::Warn)
        .unwrap_err();
    assert!(
        matches!(&err, Error::MissingSeparator { line: 4, zone } if zone == "Bad"),
        "blank lines should still count towards the line number: {err}"
    );
}

#[test]
fn duplicates() {
    let zones = ["Asia/Tokyo", "Asia/Seoul", "Asia/Tokyo"];
    let dataset = Dataset::from_zones(zones, Duplicates::Warn).unwrap();
    assert_eq!(dataset.zone_count(), 3, "duplicates should be kept");

    let err = Dataset::from_zones(zones, Duplicates::Reject).unwrap_err();
    assert!(matches!(
        err,
        Error::DuplicateCity { area, city } if area == "Asia" && city == "Tokyo"
    ));

    Dataset::from_zones(["Asia/Tokyo", "Pacific/Tokyo"], Duplicates::Reject)
        .expect("same city in different areas is not a duplicate");
}

#[test]
fn csv_columns() {
    let input = "\"Europe/Paris\",\"CET-1CEST,M3.5.0,M10.5.0/3\"\nEurope/Rome\n\n\"Etc/UTC\",\"UTC0\",extra\n";
    let dataset = Dataset::from_csv(input.as_bytes(), Duplicates::Reject).unwrap();
    let areas = dataset.areas().collect::<Vec<_>>();
    assert_eq!(areas.len(), 2);
    assert_eq!(areas[0].0, "Europe");
    assert_eq!(areas[0].1, ["Paris", "Rome"]);
    assert_eq!(areas[1].0, "Etc");
    assert_eq!(areas[1].1, ["UTC"]);
}

#[test]
fn selection_list() {
    let dataset =
        Dataset::from_zones(["Africa/Abidjan", "Africa/Accra"], Duplicates::Warn).unwrap();
    let artifacts = generate(&dataset, &options()).unwrap();
    assert!(
        artifacts
            .selection_list
            .ends_with("var tz_cities = {\"Africa\":[\"Abidjan\",\"Accra\"]};\n")
    );
    assert!(artifacts.rust.is_none());
}

#[test]
fn deterministic() {
    let input = include_str!("./tests/mixed.csv");
    let options = Options {
        rust: true,
        ..options()
    };
    let first = generate(
        &Dataset::from_csv(input.as_bytes(), Duplicates::Warn).unwrap(),
        &options,
    )
    .unwrap();
    let second = generate(
        &Dataset::from_csv(input.as_bytes(), Duplicates::Warn).unwrap(),
        &options,
    )
    .unwrap();
    assert_eq!(first.selection_list, second.selection_list);
    assert_eq!(first.cpp_header, second.cpp_header);
    assert_eq!(first.cpp_source, second.cpp_source);
    assert!(first.rust.is_some());
    assert_eq!(first.rust, second.rust);
}

#[test]
fn every_zone_resolves() {
    let input = include_str!("./tests/mixed.csv");
    let dataset = Dataset::from_csv(input.as_bytes(), Duplicates::Reject).unwrap();
    let table = LookupTable::new(&dataset, DEFAULT_PREFIX, DEFAULT_FALLBACK);
    for (area, cities) in dataset.areas() {
        for city in cities {
            assert_eq!(table.lookup(area, city), symbol(DEFAULT_PREFIX, area, city));
        }
        assert_eq!(table.lookup(area, "Atlantis"), DEFAULT_FALLBACK);
    }
    assert_eq!(
        table.lookup("Unknown_Region", "Anything"),
        table.lookup("America", "Cairo")
    );
}
