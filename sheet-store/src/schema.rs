diesel::table! {
    datasets (id) {
        id -> BigInt,
        filename -> Text,
        originalname -> Text,
        uploaded_at -> Text,
    }
}

diesel::table! {
    rows (id) {
        id -> BigInt,
        dataset_id -> BigInt,
        data -> Text,
    }
}

diesel::joinable!(rows -> datasets (dataset_id));

diesel::allow_tables_to_appear_in_same_query!(datasets, rows,);
