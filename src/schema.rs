diesel::table! {
    bgg_users (id) {
        id -> Integer,
        username -> Text,
        is_active -> Integer,
        last_full_scan -> Nullable<Text>,
    }
}

diesel::table! {
    games (id) {
        id -> Integer,
        name -> Nullable<Text>,
        image_url -> Nullable<Text>,
    }
}

diesel::table! {
    plays (id) {
        id -> Integer,
        game_id -> Integer,
        user_id -> Nullable<Integer>,
        play_date -> Text,
    }
}

diesel::joinable!(plays -> games (game_id));
diesel::joinable!(plays -> bgg_users (user_id));

diesel::allow_tables_to_appear_in_same_query!(bgg_users, games, plays);

diesel::allow_columns_to_appear_in_same_group_by_clause!(
    plays::game_id,
    games::name,
    games::image_url,
);
