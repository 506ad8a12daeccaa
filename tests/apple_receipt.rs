mod common;

use base64::{prelude::BASE64_STANDARD, Engine as _};
use chrono::{TimeZone, Utc};
use common::{
    apple_receipt, attribute, ia5, integer, pkcs7, receipt_attributes, set, utf8, Container,
    InApp,
};
use iap_receipt::{
    config::IapReceiptConfig,
    domain::entities::apple_receipt::AppleStoreProductType,
    errors::{Asn1Error, IapReceiptError},
    util::IapReceiptUtil,
};

#[test]
fn test_parse_receipt_fields() {
    let in_app = InApp::subscription("monthly", "1000000001", "2024-05-01T10:00:00Z")
        .expires("2024-06-01T10:00:00Z");
    let receipt = IapReceiptUtil::new(IapReceiptConfig::default())
        .parse_apple_receipt(&apple_receipt(&[in_app]))
        .unwrap();

    assert_eq!(receipt.bundle_id(), "com.example.app");
    assert_eq!(receipt.app_version(), "42");
    assert_eq!(receipt.opaque_value(), &[0xDE, 0xAD, 0xBE, 0xEF]);
    assert_eq!(receipt.sha1_hash(), &[0x01; 20]);
    assert_eq!(
        receipt.creation_date(),
        Some(Utc.with_ymd_and_hms(2024, 5, 30, 12, 0, 0).unwrap())
    );
    assert_eq!(receipt.original_application_version(), Some("1.0"));
    assert_eq!(receipt.expiration_date(), None);
    assert!(receipt.has_in_app_purchase_receipts());

    let purchase = &receipt.in_app_purchase_receipts()[0];
    assert_eq!(purchase.product_id(), "monthly");
    assert_eq!(purchase.transaction_id(), "1000000001");
    assert_eq!(purchase.original_transaction_id(), Some("1000000001"));
    assert_eq!(purchase.quantity(), 1);
    assert_eq!(
        purchase.purchase_date(),
        Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
    );
    assert_eq!(purchase.original_purchase_date(), Some(purchase.purchase_date()));
    assert_eq!(
        purchase.subscription_expiration_date(),
        Some(Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap())
    );
    assert_eq!(purchase.cancellation_date(), None);
    assert_eq!(purchase.web_order_line_item_id(), Some(1_000_000_042));
    assert_eq!(
        purchase.product_type(),
        AppleStoreProductType::AutoRenewingSubscription
    );
    assert!(!purchase.is_free_trial());
    assert!(!purchase.is_introductory_price_period());
}

#[test]
fn test_receipt_without_purchases() {
    let receipt = IapReceiptUtil::new(IapReceiptConfig::default())
        .parse_apple_receipt(&apple_receipt(&[]))
        .unwrap();
    assert!(receipt.in_app_purchase_receipts().is_empty());
    assert!(!receipt.has_in_app_purchase_receipts());
}

#[test]
fn test_container_encodings_decode_identically() {
    let in_apps = [
        InApp::subscription("monthly", "1", "2024-05-01T10:00:00Z"),
        InApp::subscription("yearly", "2", "2024-05-02T10:00:00Z"),
    ];
    let payload = set(&receipt_attributes(&in_apps));
    let util = IapReceiptUtil::new(IapReceiptConfig::default());

    let der = util.parse_apple_receipt(&pkcs7(&payload, Container::Der)).unwrap();
    let ber = util.parse_apple_receipt(&pkcs7(&payload, Container::Ber)).unwrap();
    let segmented = util
        .parse_apple_receipt(&pkcs7(&payload, Container::BerSegmented))
        .unwrap();
    assert_eq!(der, ber);
    assert_eq!(der, segmented);
    assert_eq!(der.in_app_purchase_receipts().len(), 2);
}

#[test]
fn test_missing_product_type_defaults_to_non_consumable() {
    let in_app = InApp::subscription("coins", "1", "2024-05-01T10:00:00Z").product_type(None);
    let receipt = IapReceiptUtil::new(IapReceiptConfig::default())
        .parse_apple_receipt(&apple_receipt(&[in_app]))
        .unwrap();
    assert_eq!(
        receipt.in_app_purchase_receipts()[0].product_type(),
        AppleStoreProductType::NonConsumable
    );
}

#[test]
fn test_alternate_purchase_date() {
    let in_app_attributes = vec![
        attribute(1702, &utf8("monthly")),
        attribute(1703, &utf8("1")),
        attribute(1707, &ia5("2024-05-03T00:00:00Z")),
    ];
    let mut attributes = receipt_attributes(&[]);
    attributes.push(attribute(17, &set(&in_app_attributes)));

    let receipt = IapReceiptUtil::new(IapReceiptConfig::default())
        .parse_apple_receipt(&pkcs7(&set(&attributes), Container::Der))
        .unwrap();
    assert_eq!(
        receipt.in_app_purchase_receipts()[0].purchase_date(),
        Utc.with_ymd_and_hms(2024, 5, 3, 0, 0, 0).unwrap()
    );
}

#[test]
fn test_missing_mandatory_attributes() {
    // No bundle id.
    let attributes: Vec<Vec<u8>> = receipt_attributes(&[]).into_iter().skip(1).collect();
    let err = IapReceiptUtil::new(IapReceiptConfig::default())
        .parse_apple_receipt(&pkcs7(&set(&attributes), Container::Der))
        .unwrap_err();
    assert!(matches!(
        err,
        IapReceiptError::MissingReceiptAttribute("bundle_id")
    ));

    // No transaction id on the in-app receipt.
    let mut attributes = receipt_attributes(&[]);
    attributes.push(attribute(
        17,
        &set(&[
            attribute(1702, &utf8("monthly")),
            attribute(1704, &ia5("2024-05-03T00:00:00Z")),
        ]),
    ));
    let err = IapReceiptUtil::new(IapReceiptConfig::default())
        .parse_apple_receipt(&pkcs7(&set(&attributes), Container::Der))
        .unwrap_err();
    assert!(matches!(
        err,
        IapReceiptError::MissingReceiptAttribute("transaction_id")
    ));
}

#[test]
fn test_creation_date_requirement_is_configurable() {
    let attributes: Vec<Vec<u8>> = receipt_attributes(&[])
        .into_iter()
        .filter(|a| a[..] != attribute(12, &ia5("2024-05-30T12:00:00Z"))[..])
        .collect();
    let receipt = pkcs7(&set(&attributes), Container::Der);

    let err = IapReceiptUtil::new(IapReceiptConfig::default())
        .parse_apple_receipt(&receipt)
        .unwrap_err();
    assert!(matches!(
        err,
        IapReceiptError::MissingReceiptAttribute("creation_date")
    ));

    let lenient = IapReceiptConfig {
        require_receipt_creation_date: false,
        ..Default::default()
    };
    let parsed = IapReceiptUtil::new(lenient).parse_apple_receipt(&receipt).unwrap();
    assert_eq!(parsed.creation_date(), None);
}

#[test]
fn test_invalid_attribute_values() {
    let mut attributes = receipt_attributes(&[]);
    // Bundle id encoded as an INTEGER.
    attributes[0] = attribute(2, &integer(7));
    let err = IapReceiptUtil::new(IapReceiptConfig::default())
        .parse_apple_receipt(&pkcs7(&set(&attributes), Container::Der))
        .unwrap_err();
    assert!(matches!(err, IapReceiptError::InvalidReceipt(_)));

    let mut attributes = receipt_attributes(&[]);
    attributes[4] = attribute(12, &ia5("yesterday"));
    let err = IapReceiptUtil::new(IapReceiptConfig::default())
        .parse_apple_receipt(&pkcs7(&set(&attributes), Container::Der))
        .unwrap_err();
    assert!(matches!(err, IapReceiptError::InvalidReceipt(_)));
}

#[test]
fn test_truncated_receipt() {
    let mut receipt = apple_receipt(&[InApp::subscription("monthly", "1", "2024-05-01T10:00:00Z")]);
    receipt.truncate(receipt.len() / 2);
    let err = IapReceiptUtil::new(IapReceiptConfig::default())
        .parse_apple_receipt(&receipt)
        .unwrap_err();
    assert!(matches!(err, IapReceiptError::Asn1(_)));
}

#[test]
fn test_not_a_pkcs7_container() {
    let err = IapReceiptUtil::new(IapReceiptConfig::default())
        .parse_apple_receipt(&set(&receipt_attributes(&[])))
        .unwrap_err();
    assert!(matches!(
        err,
        IapReceiptError::Asn1(Asn1Error::UnexpectedNode { .. })
    ));
}

#[test]
fn test_nesting_limit() {
    let config = IapReceiptConfig {
        asn1_max_depth: 2,
        ..Default::default()
    };
    let err = IapReceiptUtil::new(config)
        .parse_apple_receipt(&apple_receipt(&[]))
        .unwrap_err();
    assert!(matches!(
        err,
        IapReceiptError::Asn1(Asn1Error::TooDeep { max_depth: 2, .. })
    ));
}

#[test]
fn test_base64_receipts() {
    let util = IapReceiptUtil::new(IapReceiptConfig::default());
    let encoded = BASE64_STANDARD.encode(apple_receipt(&[InApp::subscription(
        "monthly",
        "1",
        "2024-05-01T10:00:00Z",
    )]));

    let receipt = util.parse_apple_receipt_base64(&encoded).unwrap();
    assert_eq!(receipt.in_app_purchase_receipts().len(), 1);

    assert!(matches!(
        util.parse_apple_receipt_base64("%%%"),
        Err(IapReceiptError::InvalidReceiptData { .. })
    ));

    assert_eq!(util.try_parse_apple_receipt(Some(&encoded)), Some(receipt));
    assert_eq!(util.try_parse_apple_receipt(None), None);
    assert_eq!(util.try_parse_apple_receipt(Some("")), None);
    assert_eq!(util.try_parse_apple_receipt(Some("%%%")), None);
    assert_eq!(util.try_parse_apple_receipt(Some("AAAA")), None);
}
