use actix_web::{middleware::Logger, web, App, HttpServer};
use chrono::Local; // timestamp in log lines
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter

use dream_backend::{
    cache::RedisCache,
    config::Config,
    database::{create_pool, run_migrations},
    external::{AliyunSmsService, GenerationApi, WechatApi},
    handlers,
    middlewares::{create_cors, AuthMiddleware},
    services::*,
    swagger::swagger_config,
    utils::JwtService,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    // 加载配置
    let config = Config::from_toml().expect("Failed to load configuration file");

    // 创建数据库连接池
    let pool = create_pool(&config.database)
        .await
        .expect("Failed to create database connection pool");

    // 运行数据库迁移
    run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    // 缓存 (验证码与限流标记)
    let cache = RedisCache::new(&config.redis).expect("Failed to create redis client");

    // 创建JWT服务
    let jwt_service = JwtService::new(&config.jwt.secret, config.jwt.expires_in);

    // 创建外部服务
    let wechat_api = WechatApi::new(config.wechat.clone());
    let sms_gateway = AliyunSmsService::new(config.sms.clone());
    let generation_api = GenerationApi::new(config.generation.clone());

    // 创建服务
    let sms_service = SmsService::new(cache.clone(), sms_gateway, config.sms.mode.clone());
    let auth_service = AuthService::new(
        pool.clone(),
        jwt_service.clone(),
        sms_service.clone(),
        wechat_api,
    );
    let user_service = UserService::new(pool.clone());
    let quota_service = QuotaService::new(pool.clone(), config.generation.clone());
    let character_service = CharacterService::new(pool.clone());
    let job_service = JobService::new(
        pool.clone(),
        quota_service.clone(),
        character_service.clone(),
        generation_api,
    );

    // 启动HTTP服务器
    log::info!(
        "Starting HTTP server at {}:{}",
        config.server.host,
        config.server.port
    );

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(create_cors())
            .wrap(AuthMiddleware::new(jwt_service.clone()))
            .app_data(web::Data::new(auth_service.clone()))
            .app_data(web::Data::new(sms_service.clone()))
            .app_data(web::Data::new(user_service.clone()))
            .app_data(web::Data::new(quota_service.clone()))
            .app_data(web::Data::new(character_service.clone()))
            .app_data(web::Data::new(job_service.clone()))
            .configure(swagger_config)
            .service(
                web::scope("/api/v1")
                    .configure(handlers::auth_config)
                    .configure(handlers::user_config)
                    .configure(handlers::job_config)
                    .configure(handlers::character_config),
            )
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}
