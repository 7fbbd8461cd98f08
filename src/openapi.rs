use crate::models::{Bottle, GameScore, Message, PlayerLocation, SportType, SportsRecord, SportsUser, UpdateUser, User};
use crate::routes::{analytics, bottle, files, games, messages, sports, users};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        bottle::throw,
        bottle::pick,
        bottle::close,
        bottle::throw_back,
        messages::list_messages,
        messages::create_message,
        messages::delete_message,
        sports::list_sport_types,
        sports::list_users,
        sports::create_user,
        sports::list_records,
        sports::create_record,
        files::upload,
        files::list,
        files::get_file,
        files::delete,
        users::register,
        users::login,
        users::get_user,
        users::update_user,
        users::change_password,
        games::list_scores,
        games::save_score,
        games::list_locations,
        games::save_location,
        analytics::pageview,
    ),
    components(schemas(
        Bottle, Message, SportType, SportsUser, SportsRecord, User, UpdateUser, GameScore, PlayerLocation,
        bottle::ThrowRequest, bottle::CloseRequest, bottle::ThrowBackRequest, bottle::BottleReply, bottle::PickReply,
        messages::CreateMessageRequest, messages::DeleteMessageRequest,
        sports::CreateSportsUserRequest, sports::CreateRecordRequest,
        files::FileEntry, files::FileHttpMetadata, files::DeleteFileRequest,
        users::RegisterRequest, users::LoginRequest, users::ChangePasswordRequest, users::LoginUser,
        games::SaveScoreRequest, games::SaveLocationRequest,
    )),
    tags(
        (name = "bottle", description = "Drift bottle throw / pick / close"),
        (name = "files", description = "Object store uploads"),
    )
)]
pub struct ApiDoc;
