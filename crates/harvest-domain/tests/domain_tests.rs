use harvest_domain::{Catalog, DerivedNamespace, DomainError, InMemoryCatalog, Record};

fn rec(id: &str, imtype: &str) -> Record {
    Record::new(id, imtype, "Exp 1", "0001", "2015-07-01", "side", format!("/data/{id}.jpg")).unwrap()
}

#[test]
fn test_catalog_selects_in_catalog_order() {
    let cat = InMemoryCatalog::new(vec![rec("1", "rgbsv"), rec("2", "fluosv"), rec("3", "rgbsv")]).unwrap();
    assert_eq!(cat.categories(), vec!["rgbsv".to_string(), "fluosv".to_string()]);
    let ids: Vec<String> = cat.select_by_category("rgbsv")
                              .unwrap()
                              .iter()
                              .map(|r| r.pegasusid().to_string())
                              .collect();
    assert_eq!(ids, vec!["1", "3"]);
    assert!(cat.select_by_category("nir").unwrap().is_empty());
}

#[test]
fn test_catalog_keeps_duplicate_row_ids_in_order() {
    let cat = InMemoryCatalog::new(vec![rec("1", "rgbsv"), rec("1", "rgbsv"), rec("2", "rgbsv")]).unwrap();
    assert_eq!(cat.len(), 3);
    let ids: Vec<String> = cat.select_by_category("rgbsv")
                              .unwrap()
                              .iter()
                              .map(|r| r.pegasusid().to_string())
                              .collect();
    assert_eq!(ids, vec!["1", "1", "2"]);
}

#[test]
fn test_snapshot_digest_is_order_sensitive_and_stable() {
    let a = InMemoryCatalog::new(vec![rec("1", "rgbsv"), rec("2", "rgbsv")]).unwrap();
    let b = InMemoryCatalog::new(vec![rec("1", "rgbsv"), rec("2", "rgbsv")]).unwrap();
    let c = InMemoryCatalog::new(vec![rec("2", "rgbsv"), rec("1", "rgbsv")]).unwrap();
    assert_eq!(a.digest(), b.digest());
    assert_ne!(a.digest(), c.digest());
    assert_eq!(a.digest().len(), 64);
    assert_eq!(a.snapshot_digest(), Some(a.digest()));
}

#[test]
fn test_catalog_from_json_and_namespace() {
    let cat = InMemoryCatalog::from_json_str(r#"[
        {"pegasusid": "9", "imtype": "rgbsv", "experiment": "Exp 1", "id": "0001",
         "date": "2015-07-01", "imgname": "side 0", "path": "/data/9.png"}
    ]"#).unwrap();
    let rows = cat.select_by_category("rgbsv").unwrap();
    let ns = DerivedNamespace::from_record(&rows[0]);
    assert_eq!(ns.to_string(), "Exp1/0001/2015-07-01/rgbsv/side0/9");
}

#[test]
fn test_catalog_from_invalid_json_is_external_error() {
    assert!(matches!(InMemoryCatalog::from_json_str("{"), Err(DomainError::ExternalError(_))));
}
