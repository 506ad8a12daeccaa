pub mod asn1 {
    pub mod asn1_node;
    pub mod asn1_processor;
}

pub(crate) mod data {
    pub(crate) mod datasources {
        pub(crate) mod apple_receipt_datasource;
        pub(crate) mod unified_receipt_datasource;
        mod utils;
    }
    pub(crate) mod models {
        pub(crate) mod apple_receipt {
            pub(crate) mod introductory_price_model;
            pub(crate) mod receipt_attribute_model;
        }
        pub(crate) mod google_play {
            pub(crate) mod developer_payload_model;
            pub(crate) mod purchase_json_model;
            pub(crate) mod purchase_payload_model;
            pub(crate) mod sku_details_model;
        }
        pub(crate) mod unified_receipt_model;
    }
    pub(crate) mod repositories {
        pub(crate) mod subscription_repository_impl;
    }
}

pub mod domain {
    pub mod entities {
        pub mod apple_receipt;
        pub mod subscription_info;
        pub mod subscription_period;
        pub mod subscription_source;
        pub mod subscription_update;
    }
    pub mod repositories {
        pub mod subscription_repository;
    }
}

pub mod config;
pub mod errors;
pub mod util;
