// src/store/schema.rs
// Table definitions for the PostgreSQL backend; kept in sync with the
// embedded migrations.

diesel::table! {
    events (event_id) {
        event_id -> Varchar,
        title -> Nullable<Varchar>,
        description -> Nullable<Text>,
        event_date -> Nullable<Timestamptz>,
        location -> Nullable<Varchar>,
        organizer -> Nullable<Varchar>,
        status -> Varchar,
        capacity -> Int4,
        registered_count -> Int4,
        waitlist_enabled -> Bool,
        waitlist -> Array<Text>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    users (user_id) {
        user_id -> Varchar,
        name -> Varchar,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    registrations (user_id, event_id) {
        user_id -> Varchar,
        event_id -> Varchar,
        status -> Varchar,
        registered_at -> Timestamptz,
        event_title -> Nullable<Varchar>,
        event_date -> Nullable<Timestamptz>,
    }
}

diesel::allow_tables_to_appear_in_same_query!(events, users, registrations);
