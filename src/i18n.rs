//! UI language and the fallback texts shown in notices.

use std::fmt;

/// Supported UI languages; Uzbek is the site default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Lang {
    #[default]
    Uz,
    Ru,
    En,
}

impl Lang {
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::Uz => "uz",
            Self::Ru => "ru",
            Self::En => "en",
        }
    }

    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_lowercase().as_str() {
            "uz" => Some(Self::Uz),
            "ru" => Some(Self::Ru),
            "en" => Some(Self::En),
            _ => None,
        }
    }
}

impl fmt::Display for Lang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Client-side texts used when the server sends no message of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Text {
    LoginRequired,
    LoadPostsFailed,
    LoadCommentsFailed,
    LikeFailed,
    CommentFailed,
    LoginFailed,
    RegisterFailed,
    VerifyFailed,
    RegistrationComplete,
    NewsletterFailed,
    ContactFailed,
    ContactSent,
    PostNotFound,
    ProfileNotFound,
    UsernameMissing,
    ProfileUpdated,
    LoadChatUsersFailed,
    LoadMessagesFailed,
    SendMessageFailed,
    GenericError,
}

impl Text {
    #[must_use]
    pub fn get(self, lang: Lang) -> &'static str {
        match lang {
            Lang::Uz => self.uz(),
            Lang::Ru => self.ru(),
            Lang::En => self.en(),
        }
    }

    fn uz(self) -> &'static str {
        match self {
            Self::LoginRequired => "Tizimga kiring",
            Self::LoadPostsFailed => "Postlarni yuklashda xatolik yuz berdi",
            Self::LoadCommentsFailed => "Izohlarni yuklashda xatolik yuz berdi",
            Self::LikeFailed => "Like qilishda xatolik yuz berdi",
            Self::CommentFailed => "Izoh qo'shishda xatolik yuz berdi",
            Self::LoginFailed => "Tizimga kirishda xatolik yuz berdi",
            Self::RegisterFailed => "Ro'yxatdan o'tishda xatolik yuz berdi",
            Self::VerifyFailed => "Tasdiqlashda xatolik yuz berdi",
            Self::RegistrationComplete => {
                "Ro'yxatdan o'tish muvaffaqiyatli! Endi tizimga kiring."
            }
            Self::NewsletterFailed => "Xatolik yuz berdi. Qaytadan urinib ko'ring.",
            Self::ContactFailed => "Xatolik yuz berdi. Qaytadan urinib ko'ring.",
            Self::ContactSent => "Sizning habaringiz muvaffaqiyatli yuborildi!",
            Self::PostNotFound => "Post topilmadi",
            Self::ProfileNotFound => "Foydalanuvchi topilmadi",
            Self::UsernameMissing => "Foydalanuvchi nomi ko'rsatilmagan",
            Self::ProfileUpdated => "Profil muvaffaqiyatli yangilandi!",
            Self::LoadChatUsersFailed => "Foydalanuvchilarni yuklashda xatolik yuz berdi",
            Self::LoadMessagesFailed => "Xabarlarni yuklashda xatolik yuz berdi",
            Self::SendMessageFailed => "Xabar yuborishda xatolik yuz berdi",
            Self::GenericError => "Xatolik yuz berdi",
        }
    }

    fn ru(self) -> &'static str {
        match self {
            Self::LoginRequired => "Войдите в систему",
            Self::LoadPostsFailed => "Ошибка при загрузке постов",
            Self::LoadCommentsFailed => "Ошибка при загрузке комментариев",
            Self::LikeFailed => "Не удалось поставить лайк",
            Self::CommentFailed => "Не удалось добавить комментарий",
            Self::LoginFailed => "Ошибка при входе",
            Self::RegisterFailed => "Ошибка при регистрации",
            Self::VerifyFailed => "Ошибка при подтверждении",
            Self::RegistrationComplete => "Регистрация завершена! Теперь войдите.",
            Self::NewsletterFailed | Self::ContactFailed => {
                "Произошла ошибка. Попробуйте ещё раз."
            }
            Self::ContactSent => "Ваше сообщение успешно отправлено!",
            Self::PostNotFound => "Пост не найден",
            Self::ProfileNotFound => "Пользователь не найден",
            Self::UsernameMissing => "Имя пользователя не указано",
            Self::ProfileUpdated => "Профиль успешно обновлён!",
            Self::LoadChatUsersFailed => "Ошибка при загрузке пользователей",
            Self::LoadMessagesFailed => "Ошибка при загрузке сообщений",
            Self::SendMessageFailed => "Не удалось отправить сообщение",
            Self::GenericError => "Произошла ошибка",
        }
    }

    fn en(self) -> &'static str {
        match self {
            Self::LoginRequired => "Please log in",
            Self::LoadPostsFailed => "Failed to load posts",
            Self::LoadCommentsFailed => "Failed to load comments",
            Self::LikeFailed => "Failed to like the post",
            Self::CommentFailed => "Failed to add the comment",
            Self::LoginFailed => "Login failed",
            Self::RegisterFailed => "Registration failed",
            Self::VerifyFailed => "Verification failed",
            Self::RegistrationComplete => "Registration complete! You can log in now.",
            Self::NewsletterFailed | Self::ContactFailed => "Something went wrong. Please try again.",
            Self::ContactSent => "Your message has been sent!",
            Self::PostNotFound => "Post not found",
            Self::ProfileNotFound => "User not found",
            Self::UsernameMissing => "No username given",
            Self::ProfileUpdated => "Profile updated!",
            Self::LoadChatUsersFailed => "Failed to load users",
            Self::LoadMessagesFailed => "Failed to load messages",
            Self::SendMessageFailed => "Failed to send the message",
            Self::GenericError => "Something went wrong",
        }
    }
}
