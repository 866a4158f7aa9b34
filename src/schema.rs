table! {
    blog_config (blog_config_id) {
        blog_config_id -> Int4,
        navbar_title -> Varchar,
        homepage_heading -> Varchar,
        homepage_subheading -> Varchar,
        banner_image_url -> Varchar,
        about -> Text,
    }
}

table! {
    posts (post_id) {
        post_id -> Int4,
        date_created -> Timestamp,
        title -> Varchar,
        description -> Varchar,
        content -> Text,
        created_by_user_id -> Int4,
        image_url -> Nullable<Varchar>,
    }
}

table! {
    sessions (id) {
        id -> Varchar,
        identity -> Text,
        expires -> Timestamp,
    }
}

table! {
    users (user_id) {
        user_id -> Int4,
        date_created -> Timestamp,
        email -> Varchar,
        password -> Varchar,
        is_admin -> Bool,
        is_author -> Bool,
        name -> Nullable<Varchar>,
        bio -> Nullable<Text>,
        organization -> Nullable<Varchar>,
        social_media_link -> Nullable<Varchar>,
    }
}

joinable!(posts -> users (created_by_user_id));

allow_tables_to_appear_in_same_query!(blog_config, posts, sessions, users,);
